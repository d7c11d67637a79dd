//! Ordered detection strategies.
//!
//! A detector is a list of named strategies evaluated in priority order. The
//! first strategy that yields a command wins; the rest are never run.

use crate::script::StartupCommand;
use tracing::{debug, info};

pub type Resolve<C> = fn(&C) -> Option<StartupCommand>;

pub struct Strategy<C> {
    pub name: &'static str,
    resolve: Resolve<C>,
}

impl<C> Strategy<C> {
    pub const fn new(name: &'static str, resolve: Resolve<C>) -> Self {
        Self { name, resolve }
    }
}

impl<C> std::fmt::Debug for Strategy<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Runs `strategies` in order and returns the first command found. The
/// command's `source` is set to the name of the strategy that produced it.
pub fn first_match<C>(strategies: &[Strategy<C>], ctx: &C) -> Option<StartupCommand> {
    for strategy in strategies {
        match (strategy.resolve)(ctx).filter(|c| !c.command.trim().is_empty()) {
            Some(mut command) => {
                info!(commandSource = strategy.name, "Startup command determined");
                command.source = strategy.name.to_string();
                return Some(command);
            }
            None => debug!("Strategy {} did not match", strategy.name),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: String) -> StartupCommand {
        StartupCommand::new("", text)
    }

    #[test]
    fn test_first_success_wins() {
        let strategies: Vec<Strategy<u32>> = vec![
            Strategy::new("Never", |_| None),
            Strategy::new("Even", |n| (n % 2 == 0).then(|| cmd(format!("even {}", n)))),
            Strategy::new("Always", |n| Some(cmd(format!("always {}", n)))),
        ];

        let hit = first_match(&strategies, &4).unwrap();
        assert_eq!(hit.command, "even 4");
        assert_eq!(hit.source, "Even");

        let hit = first_match(&strategies, &3).unwrap();
        assert_eq!(hit.source, "Always");
    }

    #[test]
    fn test_later_strategies_not_evaluated() {
        let strategies: Vec<Strategy<()>> = vec![
            Strategy::new("First", |_| Some(cmd("run".to_string()))),
            Strategy::new("Second", |_| -> Option<StartupCommand> {
                panic!("second strategy must not run")
            }),
        ];

        assert_eq!(first_match(&strategies, &()).unwrap().source, "First");
    }

    #[test]
    fn test_blank_command_is_a_miss() {
        let strategies: Vec<Strategy<()>> = vec![
            Strategy::new("Blank", |_| Some(cmd("   ".to_string()))),
            Strategy::new("Real", |_| Some(cmd("node app.js".to_string()))),
        ];

        assert_eq!(first_match(&strategies, &()).unwrap().source, "Real");
    }

    #[test]
    fn test_no_match() {
        let strategies: Vec<Strategy<()>> = vec![Strategy::new("Never", |_| None)];
        assert!(first_match(&strategies, &()).is_none());
    }
}
