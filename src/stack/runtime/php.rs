use super::{enter_app_dir, extensible_exports, prologue, GenerationContext, Runtime};
use crate::error::ScriptError;
use crate::fs::FileSystem;
use crate::script::builder::SH;
use crate::script::command::user_command;
use crate::script::{ScriptBuilder, StartupCommand};
use crate::stack::strategy::{first_match, Strategy};
use crate::stack::PlatformId;
use std::path::Path;
use tracing::info;

/// PHP served by apache, or by php-fpm behind nginx.
#[derive(Debug, Clone, Default)]
pub struct PhpRuntime {
    pub fpm: bool,
}

struct PhpDetection<'a> {
    fpm: bool,
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
}

fn explicit_command(d: &PhpDetection) -> Option<StartupCommand> {
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn fpm(d: &PhpDetection) -> Option<StartupCommand> {
    d.fpm
        .then(|| StartupCommand::new("", "php-fpm -F").with_preamble(["service nginx start"]))
}

fn apache(_: &PhpDetection) -> Option<StartupCommand> {
    Some(StartupCommand::new("", "apache2-foreground"))
}

fn strategies<'a>() -> Vec<Strategy<PhpDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("Fpm", fpm),
        Strategy::new("Apache", apache),
    ]
}

impl Runtime for PhpRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Php
    }

    fn binary(&self) -> &'static str {
        "php"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating PHP startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);

        builder.export_resolved(&ctx.port(&PlatformId::Php));
        builder.export("APACHE_PORT", "$PORT");

        let public_dir = app_path.join("public");
        if ctx.fs.is_file(&public_dir.join("index.php")) {
            info!("Serving from {}", public_dir.display());
            let document_root = format!("\"{}\"", public_dir.display());
            builder.export_resolved(&ctx.resolver.resolve(
                None,
                "APACHE_DOCUMENT_ROOT",
                None,
                &document_root,
            ));
        }

        extensible_exports(&mut builder, ctx);

        let detection = PhpDetection {
            fpm: self.fpm,
            fs: ctx.fs,
            app_path,
            user_command: ctx.app.user_command(),
        };
        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Php))?;
        Ok(builder.finish(command))
    }
}
