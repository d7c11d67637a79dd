crate::define_id_enum! {
    /// Application platform a startup script is generated for
    PlatformId {
        DotNet => "dotnet" : ".NET" | "dotnetcore" | "aspnetcore",
        Node => "node" : "Node.js" | "nodejs",
        Php => "php" : "PHP",
        Python => "python" : "Python",
        Ruby => "ruby" : "Ruby",
        Golang => "golang" : "Go" | "go",
        Hugo => "hugo" : "Hugo" | "static",
    }
}

impl PlatformId {
    /// Port the application listens on when nothing else is configured.
    pub fn default_bind_port(&self) -> &'static str {
        match self {
            PlatformId::Python => "80",
            _ => "8080",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_with_aliases() {
        assert_eq!(PlatformId::from_name("node"), Some(PlatformId::Node));
        assert_eq!(PlatformId::from_name("nodejs"), Some(PlatformId::Node));
        assert_eq!(PlatformId::from_name("DotNetCore"), Some(PlatformId::DotNet));
        assert_eq!(PlatformId::from_name(".NET"), Some(PlatformId::DotNet));
        assert_eq!(PlatformId::from_name(" go "), Some(PlatformId::Golang));
        assert_eq!(PlatformId::from_name("static"), Some(PlatformId::Hugo));
        assert_eq!(PlatformId::from_name("java"), None);
    }

    #[test]
    fn test_from_str_error_lists_platforms() {
        let err = "cobol".parse::<PlatformId>().unwrap_err();
        assert!(err.contains("cobol"));
        assert!(err.contains("dotnet, node, php, python, ruby, golang, hugo"));
    }

    #[test]
    fn test_display_and_canonical() {
        assert_eq!(PlatformId::DotNet.to_string(), ".NET");
        assert_eq!(PlatformId::DotNet.canonical_name(), "dotnet");
        assert_eq!(PlatformId::Custom("deno".to_string()).to_string(), "deno");
    }

    #[test]
    fn test_serde() {
        assert_eq!(serde_json::to_string(&PlatformId::Golang).unwrap(), "\"golang\"");
        let parsed: PlatformId = serde_json::from_str("\"nodejs\"").unwrap();
        assert_eq!(parsed, PlatformId::Node);
        let custom: PlatformId = serde_json::from_str("\"deno\"").unwrap();
        assert_eq!(custom, PlatformId::Custom("deno".to_string()));
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(PlatformId::Python.default_bind_port(), "80");
        for platform in PlatformId::all_variants() {
            if *platform != PlatformId::Python {
                assert_eq!(platform.default_bind_port(), "8080");
            }
        }
    }
}
