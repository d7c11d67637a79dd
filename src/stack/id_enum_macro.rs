/// Declares a string-backed identifier enum.
///
/// Each variant has a canonical name (used on the command line and when
/// serializing), a display name, and any number of aliases. Lookup by name is
/// case-insensitive and accepts all three. Names that match nothing
/// deserialize to `Custom`.
#[macro_export]
macro_rules! define_id_enum {
    (
        $(#[$enum_meta:meta])*
        $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $canonical:literal : $display_name:literal
                $( | $alias:literal )*
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
            Custom(String),
        }

        impl $enum_name {
            pub fn canonical_name(&self) -> &str {
                match self {
                    $(
                        Self::$variant => $canonical,
                    )*
                    Self::Custom(name) => name,
                }
            }

            pub fn name(&self) -> String {
                match self {
                    $(
                        Self::$variant => $display_name.to_string(),
                    )*
                    Self::Custom(name) => name.clone(),
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = name.trim().to_ascii_lowercase();
                $(
                    let names: &[&str] = &[$canonical, $display_name $(, $alias)*];
                    if names.iter().any(|n| n.to_ascii_lowercase() == wanted) {
                        return Some(Self::$variant);
                    }
                )*
                None
            }

            pub fn all_variants() -> &'static [Self] {
                &[
                    $(
                        Self::$variant,
                    )*
                ]
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s).ok_or_else(|| {
                    let known: Vec<&str> = Self::all_variants()
                        .iter()
                        .map(|v| v.canonical_name())
                        .collect();
                    format!("unknown value '{}', expected one of: {}", s, known.join(", "))
                })
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl serde::Serialize for $enum_name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.canonical_name())
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from_name(&s).unwrap_or(Self::Custom(s)))
            }
        }
    };
}
