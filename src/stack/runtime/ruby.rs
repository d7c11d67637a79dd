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

const RAILS_MARKERS: &[&str] = &["bin/rails", "config/application.rb"];

/// Ruby: Rails, then any Rack app, then the default app.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyRuntime;

struct RubyDetection<'a> {
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
    default_app: Option<&'a Path>,
    rails_env: Option<String>,
}

fn explicit_command(d: &RubyDetection) -> Option<StartupCommand> {
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn rails(d: &RubyDetection) -> Option<StartupCommand> {
    let marker = RAILS_MARKERS
        .iter()
        .find(|m| d.fs.is_file(&d.app_path.join(m)))?;
    info!("Found Rails app ({})", marker);
    Some(
        StartupCommand::new("", "bundle exec rails server -b 0.0.0.0 -p $PORT")
            .with_preamble(d.rails_env.clone()),
    )
}

fn rack(d: &RubyDetection) -> Option<StartupCommand> {
    d.fs.is_file(&d.app_path.join("config.ru"))
        .then(|| StartupCommand::new("", "bundle exec rackup config.ru -o 0.0.0.0 -p $PORT"))
}

fn default_app(d: &RubyDetection) -> Option<StartupCommand> {
    let app = d.default_app?;
    Some(StartupCommand::new("", format!("ruby {}", app.display())))
}

fn strategies<'a>() -> Vec<Strategy<RubyDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("Rails", rails),
        Strategy::new("Rack", rack),
        Strategy::new("DefaultApp", default_app),
    ]
}

impl Runtime for RubyRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Ruby
    }

    fn binary(&self) -> &'static str {
        "ruby"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating Ruby startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);
        builder.export_resolved(&ctx.port(&PlatformId::Ruby));
        extensible_exports(&mut builder, ctx);

        let detection = RubyDetection {
            fs: ctx.fs,
            app_path,
            user_command: ctx.app.user_command(),
            default_app: ctx.app.default_app.as_deref(),
            rails_env: ctx
                .resolver
                .resolve(None, "RAILS_ENV", None, "production")
                .export_statement(),
        };
        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Ruby))?;
        Ok(builder.finish(command))
    }
}
