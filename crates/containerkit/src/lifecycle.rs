//! The reconciliation pass.
//!
//! A pass loads the desired containers from a built tree, classifies them,
//! installs what changed and then, if the caller asked for it, brings the
//! running containers in line:
//!
//! 1. install, reloading the service manager when a unit changed
//! 2. sample run status once
//! 3. partition into skip / start / update / restart
//! 4. apply in that order

use crate::backend::{ContainerRuntime, MachineSupervisor, ServiceManager};
use crate::compare::{Comparison, classify};
use crate::conf::CompareConfig;
use crate::error::Result;
use crate::install::{InstallReport, install};
use crate::layout::Layout;
use crate::loader::load_names;
use crate::terminate::{Sleeper, Terminator};
use crate::types::{
    Actions, ChangeClass, ContainerName, ReconciliationPlan, RetryConfig, RunStatus, join_names,
};
use crate::update::live_update;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Split the desired containers into action buckets.
///
/// Every container in `comparison` lands in exactly one bucket. Containers
/// missing from `status` are treated as inactive.
pub fn partition(
    comparison: &Comparison,
    status: &BTreeMap<ContainerName, RunStatus>,
    actions: Actions,
) -> ReconciliationPlan {
    if !actions.any() {
        return ReconciliationPlan::skip_all(comparison.iter().map(|(name, _)| name));
    }

    let mut plan = ReconciliationPlan::default();
    for (name, class) in comparison.iter() {
        let running = status.get(name) == Some(&RunStatus::Active);
        let bucket = match (running, class) {
            (false, _) if actions.start => &mut plan.start,
            (true, ChangeClass::ConfigOnlyChanged) if !actions.restart => &mut plan.update,
            (true, ChangeClass::ConfigOnlyChanged | ChangeClass::FullyChanged) => {
                &mut plan.restart
            }
            _ => &mut plan.skip,
        };
        bucket.insert(name.clone());
    }
    plan
}

/// The external collaborators a pass drives.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub services: &'a dyn ServiceManager,
    pub machines: &'a dyn MachineSupervisor,
    pub runtime: &'a dyn ContainerRuntime,
    pub sleeper: &'a dyn Sleeper,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub comparison: Comparison,
    pub install: InstallReport,
    pub plan: ReconciliationPlan,
    /// Containers whose live update failed; they were left as they were
    pub failed_updates: Vec<ContainerName>,
}

/// Runs reconciliation passes against one host.
pub struct Controller<'a> {
    layout: &'a Layout,
    compare: &'a CompareConfig,
    retry: RetryConfig,
    backends: Backends<'a>,
}

impl<'a> Controller<'a> {
    pub fn new(
        layout: &'a Layout,
        compare: &'a CompareConfig,
        retry: RetryConfig,
        backends: Backends<'a>,
    ) -> Self {
        Self {
            layout,
            compare,
            retry,
            backends,
        }
    }

    /// Classify the tree at `root` without touching the host.
    pub fn preview(&self, root: &Path) -> Result<Comparison> {
        let names = load_names(&self.layout.definitions, root)?;
        classify(self.layout, self.compare, root, &names)
    }

    /// Reconcile the host with the tree at `root`.
    pub fn reconcile(&self, root: &Path, actions: Actions) -> Result<PassReport> {
        let comparison = self.preview(root)?;

        let install = install(self.layout, root, &comparison)?;
        if install.reload_required {
            log::info!("Reloading unit definitions");
            self.backends.services.reload()?;
        }

        let status = if actions.any() {
            self.status(&comparison)
        } else {
            BTreeMap::new()
        };

        let plan = partition(&comparison, &status, actions);
        log::debug!(
            "Plan for {} containers: {} start, {} update, {} restart",
            plan.total(),
            plan.start.len(),
            plan.update.len(),
            plan.restart.len()
        );
        let failed_updates = self.apply(&plan)?;

        Ok(PassReport {
            comparison,
            install,
            plan,
            failed_updates,
        })
    }

    /// Run status of every desired container. A failed query leaves every
    /// container inactive.
    fn status(&self, comparison: &Comparison) -> BTreeMap<ContainerName, RunStatus> {
        let names: Vec<ContainerName> = comparison.iter().map(|(name, _)| name.clone()).collect();
        match self.backends.services.status(&names) {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Could not query container status: {e}");
                BTreeMap::new()
            }
        }
    }

    fn apply(&self, plan: &ReconciliationPlan) -> Result<Vec<ContainerName>> {
        let to_start: Vec<ContainerName> = plan.start.iter().cloned().collect();
        if !to_start.is_empty() {
            log::info!("Starting {}", join_names(&to_start));
            self.backends.services.start(&to_start)?;
        }

        let mut failed_updates = Vec::new();
        for name in &plan.update {
            if let Err(e) = live_update(self.backends.runtime, self.layout, self.compare, name) {
                log::warn!("Updating {name} failed: {e}");
                failed_updates.push(name.clone());
            }
        }

        let to_restart: Vec<ContainerName> = plan.restart.iter().cloned().collect();
        if !to_restart.is_empty() {
            log::info!("Restarting {}", join_names(&to_restart));
            Terminator::new(
                self.backends.services,
                self.backends.machines,
                self.retry,
                self.backends.sleeper,
            )
            .restart(&to_restart)?;
        }

        Ok(failed_updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TerminateOutcome;
    use crate::error::Error;
    use crate::testing::{CountingSleeper, FakeHost, name};
    use std::collections::BTreeSet;
    use std::fs;
    use std::hash::{DefaultHasher, Hash, Hasher};
    use std::os::unix::fs::symlink;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn set(list: &[&str]) -> BTreeSet<ContainerName> {
        list.iter().map(|n| name(n)).collect()
    }

    fn comparison(entries: &[(&str, ChangeClass)]) -> Comparison {
        entries
            .iter()
            .map(|(n, class)| (name(n), *class))
            .collect()
    }

    fn status(entries: &[(&str, RunStatus)]) -> BTreeMap<ContainerName, RunStatus> {
        entries.iter().map(|(n, s)| (name(n), *s)).collect()
    }

    const UPDATE: Actions = Actions {
        start: false,
        update: true,
        restart: false,
    };

    const START: Actions = Actions {
        start: true,
        update: false,
        restart: false,
    };

    const RESTART: Actions = Actions {
        start: false,
        update: false,
        restart: true,
    };

    #[test]
    fn test_partition_without_actions_skips_everything() {
        let cmp = comparison(&[
            ("foo", ChangeClass::FullyChanged),
            ("bar", ChangeClass::Unchanged),
        ]);
        let plan = partition(&cmp, &BTreeMap::new(), Actions::default());
        assert_eq!(plan.skip, set(&["foo", "bar"]));
        assert!(!plan.has_actions());
    }

    #[test]
    fn test_partition_config_only_running_is_updated() {
        let cmp = comparison(&[
            ("foo", ChangeClass::Unchanged),
            ("bar", ChangeClass::ConfigOnlyChanged),
        ]);
        let st = status(&[("foo", RunStatus::Active), ("bar", RunStatus::Active)]);
        let plan = partition(&cmp, &st, UPDATE);
        assert_eq!(plan.update, set(&["bar"]));
        assert!(plan.restart.is_empty());
        assert_eq!(plan.skip, set(&["foo"]));
    }

    #[test]
    fn test_partition_fully_changed_running_is_restarted() {
        let cmp = comparison(&[("bar", ChangeClass::FullyChanged)]);
        let st = status(&[("bar", RunStatus::Active)]);
        let plan = partition(&cmp, &st, UPDATE);
        assert_eq!(plan.restart, set(&["bar"]));
        assert!(plan.update.is_empty());
    }

    #[test]
    fn test_partition_forced_restart_never_updates() {
        let cmp = comparison(&[
            ("a", ChangeClass::ConfigOnlyChanged),
            ("b", ChangeClass::FullyChanged),
            ("c", ChangeClass::Unchanged),
        ]);
        let st = status(&[
            ("a", RunStatus::Active),
            ("b", RunStatus::Active),
            ("c", RunStatus::Active),
        ]);
        let plan = partition(
            &cmp,
            &st,
            Actions {
                update: true,
                restart: true,
                ..Default::default()
            },
        );
        assert!(plan.update.is_empty());
        assert_eq!(plan.restart, set(&["a", "b"]));
        assert_eq!(plan.skip, set(&["c"]));
    }

    #[test]
    fn test_partition_stopped_containers_start_only_when_requested() {
        let cmp = comparison(&[
            ("foo", ChangeClass::Unchanged),
            ("bar", ChangeClass::ConfigOnlyChanged),
        ]);
        let st = status(&[("foo", RunStatus::Active), ("bar", RunStatus::Inactive)]);

        let plan = partition(&cmp, &st, START);
        assert_eq!(plan.start, set(&["bar"]));
        assert!(plan.update.is_empty() && plan.restart.is_empty());

        let plan = partition(&cmp, &st, UPDATE);
        assert!(plan.start.is_empty());
        assert_eq!(plan.skip, set(&["foo", "bar"]));
    }

    #[test]
    fn test_partition_unknown_status_is_inactive() {
        let cmp = comparison(&[("bar", ChangeClass::FullyChanged)]);
        let plan = partition(&cmp, &BTreeMap::new(), START);
        assert_eq!(plan.start, set(&["bar"]));
    }

    #[test]
    fn test_partition_is_complete_and_exclusive() {
        let classes = [
            ChangeClass::Unchanged,
            ChangeClass::ConfigOnlyChanged,
            ChangeClass::FullyChanged,
        ];
        let runs = [RunStatus::Active, RunStatus::Inactive];
        let mut entries = Vec::new();
        let mut st = BTreeMap::new();
        for (i, class) in classes.iter().enumerate() {
            for (j, run) in runs.iter().enumerate() {
                let n = name(&format!("c{i}{j}"));
                st.insert(n.clone(), *run);
                entries.push((n, *class));
            }
        }
        let cmp: Comparison = entries.into_iter().collect();

        for bits in 0..8u8 {
            let actions = Actions {
                start: bits & 1 != 0,
                update: bits & 2 != 0,
                restart: bits & 4 != 0,
            };
            let plan = partition(&cmp, &st, actions);
            assert_eq!(plan.total(), cmp.len());

            let mut union = BTreeSet::new();
            for bucket in [&plan.skip, &plan.start, &plan.update, &plan.restart] {
                union.extend(bucket.iter().cloned());
            }
            assert_eq!(union.len(), cmp.len());
            if actions.restart {
                assert!(plan.update.is_empty());
            }
        }
    }

    /// A host directory plus a fake store that builds are assembled from.
    struct Fixture {
        temp: TempDir,
        layout: Layout,
        compare: CompareConfig,
        host: FakeHost,
        sleeper: CountingSleeper,
    }

    impl Fixture {
        fn new(host: FakeHost) -> Self {
            let temp = TempDir::new().unwrap();
            let layout = Layout::under(&temp.path().join("host"));
            Self {
                temp,
                layout,
                compare: CompareConfig::default(),
                host,
                sleeper: CountingSleeper::default(),
            }
        }

        fn store(&self, key: &str, text: &str) -> PathBuf {
            let path = self.temp.path().join("store").join(key);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, text).unwrap();
            path
        }

        /// Build a tree from `(name, unit key, config text)` triples.
        fn build(&self, tag: &str, containers: &[(&str, &str, &str)]) -> PathBuf {
            let root = self.temp.path().join(tag);
            let units = root.join("etc/systemd/system");
            let configs = root.join("etc/nixos-containers");
            fs::create_dir_all(&units).unwrap();
            fs::create_dir_all(&configs).unwrap();
            for (n, unit, conf) in containers {
                let unit = self.store(&format!("unit-{n}-{unit}"), "[Unit]\n");
                let mut hasher = DefaultHasher::new();
                conf.hash(&mut hasher);
                let conf = self.store(&format!("{n}-{:x}.conf", hasher.finish()), conf);
                symlink(unit, units.join(format!("container@{n}.service"))).unwrap();
                symlink(conf, configs.join(format!("{n}.conf"))).unwrap();
            }
            root
        }

        fn controller(&self) -> Controller<'_> {
            Controller::new(
                &self.layout,
                &self.compare,
                RetryConfig::default(),
                Backends {
                    services: &self.host,
                    machines: &self.host,
                    runtime: &self.host,
                    sleeper: &self.sleeper,
                },
            )
        }
    }

    const FOO: &str = "LOCAL_ADDRESS=10.0.0.2\nSYSTEM_PATH=/nix/store/sys-foo\n";
    const BAR: &str = "LOCAL_ADDRESS=10.0.0.3\nSYSTEM_PATH=/nix/store/sys-bar-1\n";
    const BAR_NEW_SYSTEM: &str = "LOCAL_ADDRESS=10.0.0.3\nSYSTEM_PATH=/nix/store/sys-bar-2\n";
    const BAR_NEW_ADDRESS: &str = "LOCAL_ADDRESS=10.0.0.9\nSYSTEM_PATH=/nix/store/sys-bar-1\n";

    fn installed_pair(fx: &Fixture) {
        let first = fx.build("gen-1", &[("foo", "1", FOO), ("bar", "1", BAR)]);
        fx.controller().reconcile(&first, Actions::default()).unwrap();
        fx.host.calls.borrow_mut().clear();
    }

    #[test]
    fn test_system_change_on_running_container_is_live_updated() {
        let fx = Fixture::new(FakeHost::with_active(&["foo", "bar"]));
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_SYSTEM)]);
        let report = fx.controller().reconcile(&second, UPDATE).unwrap();

        assert_eq!(report.comparison.class(&name("foo")), Some(ChangeClass::Unchanged));
        assert_eq!(
            report.comparison.class(&name("bar")),
            Some(ChangeClass::ConfigOnlyChanged)
        );
        assert_eq!(report.plan.update, set(&["bar"]));
        assert!(report.plan.restart.is_empty());
        assert_eq!(report.plan.skip, set(&["foo"]));
        assert!(!report.install.reload_required);
        assert_eq!(
            fx.host.calls(),
            vec![
                "status bar foo",
                "run bar /nix/store/sys-bar-2/bin/switch-to-configuration test",
            ]
        );
    }

    #[test]
    fn test_system_change_on_stopped_container_is_started() {
        let fx = Fixture::new(FakeHost::with_active(&["foo"]));
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_SYSTEM)]);
        let report = fx.controller().reconcile(&second, START).unwrap();

        assert_eq!(report.plan.start, set(&["bar"]));
        assert!(report.plan.update.is_empty());
        assert!(report.plan.restart.is_empty());
        assert_eq!(fx.host.calls(), vec!["status bar foo", "start bar"]);
    }

    #[test]
    fn test_config_change_on_running_container_restarts_it() {
        let fx = Fixture::new(FakeHost::with_active(&["foo", "bar"]));
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_ADDRESS)]);
        let report = fx.controller().reconcile(&second, UPDATE).unwrap();

        assert_eq!(report.comparison.class(&name("bar")), Some(ChangeClass::FullyChanged));
        assert_eq!(report.plan.restart, set(&["bar"]));
        assert_eq!(
            fx.host.calls(),
            vec!["status bar foo", "stop bar", "terminate bar", "start bar"]
        );
    }

    #[test]
    fn test_unit_change_reloads_before_restart() {
        let fx = Fixture::new(FakeHost::with_active(&["foo", "bar"]));
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "2", BAR)]);
        let report = fx.controller().reconcile(&second, UPDATE).unwrap();

        assert!(report.install.reload_required);
        assert_eq!(report.plan.restart, set(&["bar"]));
        assert_eq!(fx.host.calls()[0], "reload");
    }

    #[test]
    fn test_forced_restart_overrides_update() {
        let fx = Fixture::new(FakeHost::with_active(&["foo", "bar"]));
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_SYSTEM)]);
        let report = fx.controller().reconcile(&second, RESTART).unwrap();

        assert!(report.plan.update.is_empty());
        assert_eq!(report.plan.restart, set(&["bar"]));
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let fx = Fixture::new(FakeHost::with_active(&["foo", "bar"]));
        installed_pair(&fx);

        let same = fx.build("gen-1b", &[("foo", "1", FOO), ("bar", "1", BAR)]);
        for _ in 0..2 {
            let report = fx.controller().reconcile(&same, UPDATE).unwrap();
            assert!(report.comparison.is_unchanged());
            assert!(report.install.is_empty());
            assert!(!report.plan.has_actions());
        }
        assert_eq!(fx.host.calls(), vec!["status bar foo", "status bar foo"]);
    }

    #[test]
    fn test_failed_update_does_not_abort_pass() {
        let mut host = FakeHost::with_active(&["foo", "bar"]);
        host.fail_update = set(&["bar"]);
        let fx = Fixture::new(host);
        installed_pair(&fx);

        let second = fx.build(
            "gen-2",
            &[("foo", "2", FOO), ("bar", "1", BAR_NEW_SYSTEM)],
        );
        let report = fx.controller().reconcile(&second, UPDATE).unwrap();

        assert_eq!(report.failed_updates, vec![name("bar")]);
        assert_eq!(report.plan.restart, set(&["foo"]));
        assert_eq!(fx.host.calls().last().unwrap(), "start foo");
    }

    #[test]
    fn test_status_failure_treats_all_as_inactive() {
        let mut host = FakeHost::with_active(&["foo", "bar"]);
        host.fail_status = true;
        let fx = Fixture::new(host);
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_ADDRESS)]);
        let report = fx.controller().reconcile(&second, UPDATE).unwrap();

        assert!(!report.plan.has_actions());
        assert_eq!(report.plan.skip, set(&["foo", "bar"]));
    }

    #[test]
    fn test_reload_failure_is_fatal() {
        let host = FakeHost {
            fail_reload: true,
            ..Default::default()
        };
        let fx = Fixture::new(host);

        let first = fx.build("gen-1", &[("foo", "1", FOO)]);
        let err = fx.controller().reconcile(&first, START).unwrap_err();

        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(fx.host.calls(), vec!["reload"]);
    }

    #[test]
    fn test_termination_timeout_aborts_pass() {
        let host = FakeHost::with_active(&["foo", "bar"]);
        host.push_outcome(TerminateOutcome::Failed("busy".to_string()));
        let fx = Fixture::new(host);
        installed_pair(&fx);

        let second = fx.build("gen-2", &[("foo", "1", FOO), ("bar", "1", BAR_NEW_ADDRESS)]);
        let err = fx.controller().reconcile(&second, UPDATE).unwrap_err();

        assert!(matches!(err, Error::TerminationTimeout { attempts: 20, .. }));
        assert_eq!(fx.sleeper.sleeps.get(), 19);
    }

    #[test]
    fn test_empty_tree_is_rejected_before_any_mutation() {
        let fx = Fixture::new(FakeHost::default());
        let root = fx.temp.path().join("empty");
        fs::create_dir_all(root.join("etc/systemd/system")).unwrap();

        let err = fx.controller().reconcile(&root, START).unwrap_err();
        assert!(matches!(err, Error::NoDefinitionsFound(_)));
        assert!(fx.host.calls().is_empty());
        assert!(!fx.layout.host.gcroots_dir.exists());
    }
}
