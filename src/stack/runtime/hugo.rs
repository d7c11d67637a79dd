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

const PUBLISH_DIR: &str = "public";

/// Static sites: serves the generated site over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HugoRuntime;

struct StaticSiteDetection<'a> {
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
}

fn explicit_command(d: &StaticSiteDetection) -> Option<StartupCommand> {
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn serve(dir: &Path) -> StartupCommand {
    StartupCommand::new(
        "",
        format!(
            "python3 -m http.server \"$PORT\" --bind 0.0.0.0 --directory \"{}\"",
            dir.display()
        ),
    )
}

fn published_site(d: &StaticSiteDetection) -> Option<StartupCommand> {
    let public = d.app_path.join(PUBLISH_DIR);
    d.fs.is_dir(&public).then(|| serve(&public))
}

fn app_root(d: &StaticSiteDetection) -> Option<StartupCommand> {
    Some(serve(d.app_path))
}

fn strategies<'a>() -> Vec<Strategy<StaticSiteDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("PublishedSite", published_site),
        Strategy::new("AppRoot", app_root),
    ]
}

impl Runtime for HugoRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Hugo
    }

    fn binary(&self) -> &'static str {
        "hugo"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating static site startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);
        builder.export_resolved(&ctx.port(&PlatformId::Hugo));
        extensible_exports(&mut builder, ctx);

        let detection = StaticSiteDetection {
            fs: ctx.fs,
            app_path,
            user_command: ctx.app.user_command(),
        };
        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Hugo))?;
        Ok(builder.finish(command))
    }
}
