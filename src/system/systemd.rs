//! systemd service manager

use std::rc::Rc;

use super::{Cmd, CommandRunner};
use crate::error::Result;

/// Service unit operations
pub trait ServiceManager {
    /// Enable a unit and start it now
    fn enable_now(&self, unit: &str) -> Result<()>;

    fn stop(&self, unit: &str) -> Result<()>;

    fn disable(&self, unit: &str) -> Result<()>;
}

/// `systemctl`
pub struct Systemd {
    runner: Rc<dyn CommandRunner>,
}

impl Systemd {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn systemctl(&self, action: &str, unit: &str) -> Result<()> {
        self.runner
            .run(&Cmd::new("systemctl").args([action, unit]).mutating())?;
        Ok(())
    }
}

impl ServiceManager for Systemd {
    fn enable_now(&self, unit: &str) -> Result<()> {
        self.runner.run(
            &Cmd::new("systemctl")
                .args(["enable", "--now", unit])
                .mutating(),
        )?;
        Ok(())
    }

    fn stop(&self, unit: &str) -> Result<()> {
        self.systemctl("stop", unit)
    }

    fn disable(&self, unit: &str) -> Result<()> {
        self.systemctl("disable", unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::RecordingRunner;

    #[test]
    fn test_systemctl_commands() {
        let runner = Rc::new(RecordingRunner::new());
        let systemd = Systemd::new(runner.clone());

        systemd.enable_now("nginx").unwrap();
        systemd.stop("apache2").unwrap();
        systemd.disable("apache2").unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "systemctl enable --now nginx",
                "systemctl stop apache2",
                "systemctl disable apache2",
            ]
        );
        assert!(runner.commands().iter().all(Cmd::is_mutating));
    }
}
