//! Helpers shared by unit tests.

use crate::App;
use crate::clients::git::BackendOutput;
use crate::clients::git::MockBackend;
use crate::clients::github::MockHostingOps;
use crate::clients::vault::MockVault;
use crate::config::Config;
use crate::history::ActionHistory;
use crate::history::MemoryStore;
use crate::prompt::MockPrompter;

pub type TestApp = App<MockBackend, MockHostingOps, MockVault, MockPrompter>;

/// The mocks an [`App`] is built from. Set expectations, then call
/// [`Mocks::into_app`].
pub struct Mocks {
    pub config: Config,
    pub backend: MockBackend,
    pub remote: MockHostingOps,
    pub vault: MockVault,
    pub prompter: MockPrompter,
    pub store: MemoryStore,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            config: Config::default_for_tests(),
            backend: MockBackend::new(),
            remote: MockHostingOps::new(),
            vault: MockVault::new(),
            prompter: MockPrompter::new(),
            store: MemoryStore::new(),
        }
    }

    /// Mocks for a command run inside a repository.
    pub fn in_repository() -> Self {
        let mut mocks = Self::new();
        expect_git(&mut mocks.backend, &["rev-parse", "--git-dir"], ".git\n");
        mocks
    }

    pub fn git(&mut self, args: &[&str], stdout: &str) -> &mut Self {
        expect_git(&mut self.backend, args, stdout);
        self
    }

    pub fn git_output(&mut self, args: &[&str], output: BackendOutput) -> &mut Self {
        expect_git_output(&mut self.backend, args, output);
        self
    }

    /// Returns the app and a handle on its history.
    pub fn into_app(self) -> (TestApp, MemoryStore) {
        let history = ActionHistory::new(self.store.clone());
        let app = App::new(
            self.config,
            self.backend,
            self.remote,
            self.vault,
            self.prompter,
            history,
        );
        (app, self.store)
    }
}

/// Expect exactly one successful git call with `args`.
pub fn expect_git(backend: &mut MockBackend, args: &[&str], stdout: &str) {
    expect_git_output(backend, args, BackendOutput::new(stdout, "", 0));
}

/// Expect exactly one git call with `args`, answered with `output`.
pub fn expect_git_output(backend: &mut MockBackend, args: &[&str], output: BackendOutput) {
    let expected: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    backend
        .expect_run()
        .withf(move |actual| *actual == expected)
        .times(1)
        .returning(move |_| Ok(output.clone()));
}

/// A git call that fails with `stderr`.
pub fn failure(stderr: &str) -> BackendOutput {
    BackendOutput::new("", stderr, 1)
}

/// The answer of `git rev-parse --verify` for a missing revision.
pub fn missing() -> BackendOutput {
    BackendOutput::new("", "", 1)
}
