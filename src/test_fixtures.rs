//! Test fixtures: temp directories and in-memory fakes of the host
//! collaborators.
//!
//! Every fake records what it was asked to do so tests can assert on the
//! exact sequence of host mutations.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_fixtures::{FakeHost, create_temp_dir};
//!
//! #[test]
//! fn my_test() {
//!     let temp = create_temp_dir();
//!     let fakes = FakeHost::new();
//!     fakes.packages.add_to_index(&["postgresql-16"]);
//!     let host = fakes.host();
//! }
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;

use crate::error::{Result, command, fetch};
use crate::orchestrator::context::Host;
use crate::system::apt::{InstalledPackage, PackageManager, PackageState};
use crate::system::http::Fetcher;
use crate::system::prompt::Prompter;
use crate::system::repository::{Repository, RepositoryRegistrar};
use crate::system::systemd::ServiceManager;
use crate::system::{Cmd, CommandOutput, CommandRunner};

/// Create a temp directory in the system temp location.
///
/// Uses `crate::temp::temp_dir_base()` to ensure temp dirs are never
/// created under the current working directory.
///
/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
#[allow(clippy::expect_used)]
pub fn create_temp_dir() -> TempDir {
    TempDir::new_in(crate::temp::temp_dir_base()).expect("Failed to create temp directory")
}

/// Command runner that records commands instead of running them
#[derive(Default)]
pub struct RecordingRunner {
    commands: RefCell<Vec<Cmd>>,
    responses: RefCell<HashMap<String, String>>,
    failing: RefCell<HashSet<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stdout returned for every run of `program`
    pub fn respond(&self, program: &str, stdout: &str) {
        self.responses
            .borrow_mut()
            .insert(program.to_string(), stdout.to_string());
    }

    /// Make every run of `program` fail
    pub fn fail(&self, program: &str) {
        self.failing.borrow_mut().insert(program.to_string());
    }

    /// Display strings of the commands run so far
    pub fn calls(&self) -> Vec<String> {
        self.commands.borrow().iter().map(Cmd::display).collect()
    }

    pub fn commands(&self) -> Vec<Cmd> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(cmd.clone());
        if self.failing.borrow().contains(cmd.program()) {
            return Err(command::failed(cmd.display(), "exit code 100", "simulated failure"));
        }
        Ok(CommandOutput {
            stdout: self
                .responses
                .borrow()
                .get(cmd.program())
                .cloned()
                .unwrap_or_default(),
            stderr: String::new(),
        })
    }
}

/// In-memory package index and dpkg database
#[derive(Default)]
pub struct FakePackages {
    index: RefCell<Vec<String>>,
    installed: RefCell<BTreeMap<String, PackageState>>,
    failing_installs: RefCell<HashSet<String>>,
    failing_operations: RefCell<HashSet<String>>,
    stubborn: RefCell<HashSet<String>>,
    alternatives: RefCell<BTreeMap<String, String>>,
    calls: RefCell<Vec<String>>,
}

impl FakePackages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_index(&self, names: &[&str]) {
        self.index
            .borrow_mut()
            .extend(names.iter().map(|n| n.to_string()));
    }

    pub fn set_installed(&self, names: &[&str]) {
        self.set_state(names, PackageState::Installed);
    }

    /// Mark packages as removed with configuration files left behind
    pub fn set_config_files(&self, names: &[&str]) {
        self.set_state(names, PackageState::ConfigFiles);
    }

    fn set_state(&self, names: &[&str], state: PackageState) {
        let mut installed = self.installed.borrow_mut();
        for name in names {
            installed.insert(name.to_string(), state);
        }
    }

    /// Any install including `name` fails
    pub fn fail_install(&self, name: &str) {
        self.failing_installs.borrow_mut().insert(name.to_string());
    }

    /// `update`, `autoremove` or `clean` fails
    pub fn fail_operation(&self, operation: &str) {
        self.failing_operations
            .borrow_mut()
            .insert(operation.to_string());
    }

    /// Package survives purges
    pub fn make_stubborn(&self, name: &str) {
        self.stubborn.borrow_mut().insert(name.to_string());
    }

    /// Names of fully installed packages, sorted
    pub fn installed_names(&self) -> Vec<String> {
        self.installed
            .borrow()
            .iter()
            .filter(|(_, state)| **state == PackageState::Installed)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn alternative(&self, name: &str) -> Option<String> {
        self.alternatives.borrow().get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing_operations.borrow().contains(operation) {
            return Err(command::failed(
                format!("apt-get {operation}"),
                "exit code 100",
                "simulated failure",
            ));
        }
        Ok(())
    }
}

impl PackageManager for FakePackages {
    fn search_names(&self, prefix: &str) -> Result<Vec<String>> {
        self.record(format!("search {prefix}"));
        Ok(self
            .index
            .borrow()
            .iter()
            .filter(|n| n.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn update(&self) -> Result<()> {
        self.record("update".to_string());
        self.check("update")
    }

    fn install(&self, packages: &[String]) -> Result<()> {
        self.record(format!("install {}", packages.join(" ")));
        let failing = self.failing_installs.borrow();
        if let Some(bad) = packages.iter().find(|p| failing.contains(*p)) {
            return Err(command::failed(
                format!("apt-get install {}", packages.join(" ")),
                "exit code 100",
                format!("E: Unable to locate package {bad}"),
            ));
        }
        self.set_state(
            &packages.iter().map(String::as_str).collect::<Vec<_>>(),
            PackageState::Installed,
        );
        Ok(())
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        self.record(format!("purge {}", packages.join(" ")));
        let stubborn = self.stubborn.borrow();
        let mut installed = self.installed.borrow_mut();
        for package in packages {
            if !stubborn.contains(package) {
                installed.remove(package);
            }
        }
        Ok(())
    }

    fn autoremove(&self) -> Result<()> {
        self.record("autoremove".to_string());
        self.check("autoremove")
    }

    fn clean(&self) -> Result<()> {
        self.record("clean".to_string());
        self.check("clean")
    }

    fn installed(&self) -> Result<Vec<InstalledPackage>> {
        Ok(self
            .installed
            .borrow()
            .iter()
            .map(|(name, state)| InstalledPackage {
                name: name.clone(),
                state: *state,
            })
            .collect())
    }

    fn set_alternative(&self, name: &str, path: &str) -> Result<()> {
        self.record(format!("alternative {name} {path}"));
        self.alternatives
            .borrow_mut()
            .insert(name.to_string(), path.to_string());
        Ok(())
    }
}

/// Service manager that records unit operations
#[derive(Default)]
pub struct FakeServices {
    calls: RefCell<Vec<String>>,
    fail_all: Cell<bool>,
}

impl FakeServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.fail_all.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, action: &str, unit: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("{action} {unit}"));
        if self.fail_all.get() {
            return Err(command::failed(
                format!("systemctl {action} {unit}"),
                "exit code 5",
                format!("Unit {unit}.service not loaded."),
            ));
        }
        Ok(())
    }
}

impl ServiceManager for FakeServices {
    fn enable_now(&self, unit: &str) -> Result<()> {
        self.record("enable", unit)
    }

    fn stop(&self, unit: &str) -> Result<()> {
        self.record("stop", unit)
    }

    fn disable(&self, unit: &str) -> Result<()> {
        self.record("disable", unit)
    }
}

/// URL → canned response
#[derive(Default)]
pub struct FakeFetcher {
    responses: RefCell<HashMap<String, String>>,
    failing_downloads: RefCell<HashSet<String>>,
    downloads: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: &str) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), body.to_string());
    }

    /// Downloads of `url` fail even when it has a response
    pub fn fail_download(&self, url: &str) {
        self.failing_downloads.borrow_mut().insert(url.to_string());
    }

    /// URLs passed to `download`, in order
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.borrow().clone()
    }

    fn body(&self, url: &str) -> Result<String> {
        self.responses
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| fetch::failed(url, "HTTP status client error (404 Not Found)"))
    }
}

impl Fetcher for FakeFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        self.body(url)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.body(url).map(String::into_bytes)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.borrow_mut().push(url.to_string());
        if self.failing_downloads.borrow().contains(url) {
            return Err(fetch::failed(url, "operation timed out"));
        }
        let body = self.body(url)?;
        fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }
}

/// Repository registrar that records registrations
#[derive(Default)]
pub struct FakeRepositories {
    registered: RefCell<Vec<Repository>>,
    failing: RefCell<HashSet<String>>,
}

impl FakeRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the repository named `name` (or PPA `name`) fails
    pub fn fail(&self, name: &str) {
        self.failing.borrow_mut().insert(name.to_string());
    }

    pub fn registered(&self) -> Vec<Repository> {
        self.registered.borrow().clone()
    }
}

impl RepositoryRegistrar for FakeRepositories {
    fn register(&self, repository: &Repository) -> Result<()> {
        let name = match repository {
            Repository::Ppa(ppa) => ppa,
            Repository::Apt { name, .. } => name,
        };
        if self.failing.borrow().contains(name) {
            return Err(fetch::failed(
                format!("https://repository.invalid/{name}"),
                "connection refused",
            ));
        }
        self.registered.borrow_mut().push(repository.clone());
        Ok(())
    }
}

/// Prompter answering from a table, recording every question
#[derive(Default)]
pub struct FakePrompter {
    answers: RefCell<HashMap<String, bool>>,
    questions: RefCell<Vec<String>>,
}

impl FakePrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `question` with `answer` instead of its default
    pub fn answer(&self, question: &str, answer: bool) {
        self.answers
            .borrow_mut()
            .insert(question.to_string(), answer);
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Prompter for FakePrompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self
            .answers
            .borrow()
            .get(question)
            .copied()
            .unwrap_or(default))
    }
}

/// Every fake, shared with the [`Host`] built from them
pub struct FakeHost {
    pub packages: Rc<FakePackages>,
    pub services: Rc<FakeServices>,
    pub repositories: Rc<FakeRepositories>,
    pub fetcher: Rc<FakeFetcher>,
    pub prompter: Rc<FakePrompter>,
    pub runner: Rc<RecordingRunner>,
}

impl FakeHost {
    pub fn new() -> Self {
        let runner = Rc::new(RecordingRunner::new());
        runner.respond("dpkg", "amd64\n");
        Self {
            packages: Rc::new(FakePackages::new()),
            services: Rc::new(FakeServices::new()),
            repositories: Rc::new(FakeRepositories::new()),
            fetcher: Rc::new(FakeFetcher::new()),
            prompter: Rc::new(FakePrompter::new()),
            runner,
        }
    }

    pub fn host(&self) -> Host {
        Host {
            packages: self.packages.clone(),
            services: self.services.clone(),
            repositories: self.repositories.clone(),
            fetcher: self.fetcher.clone(),
            prompter: self.prompter.clone(),
            runner: self.runner.clone(),
        }
    }
}
