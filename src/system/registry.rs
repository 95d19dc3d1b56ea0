//! Incrementally refreshed process table.
//!
//! Every refresh runs the same reconciliation rule over the rows the probe
//! returns:
//!
//! - an unknown PID becomes a new [`Process`] populated from the row;
//! - a known PID takes only the attributes the row actually carries, so
//!   skipped or unavailable attributes keep their last known value;
//! - a known PID with a different start time is a reused PID: the old entry
//!   is dropped and rebuilt from the row, and the PID is reported as both
//!   removed and added;
//! - PIDs examined by the refresh but not observed are pruned only when the
//!   caller asks for it.
//!
//! Each refresh bumps a generation counter, and every entry records the
//! generation in which it was last observed.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use super::probe::{PlatformProbe, ProbeResult, Probed, ProcessRecord};
use super::process::Process;
use super::refresh::ProcessRefreshConfig;

/// What a single refresh call changed.
///
/// PID lists are sorted ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Distinct processes observed by this refresh.
    pub observed: usize,
    /// PIDs seen for the first time, including reused ones.
    pub added: Vec<u32>,
    /// Known PIDs whose data changed.
    pub updated: Vec<u32>,
    /// PIDs pruned because they were no longer observed, plus reused PIDs.
    pub removed: Vec<u32>,
}

#[derive(Debug)]
struct Entry {
    process: Process,
    last_seen: u64,
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: HashMap<u32, Entry>,
    generation: u64,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes every process the probe can see.
    pub fn refresh_all<P: PlatformProbe + ?Sized>(
        &mut self,
        probe: &mut P,
        remove_dead: bool,
        config: &ProcessRefreshConfig,
    ) -> ProbeResult<RefreshReport> {
        let _span = tracing::debug_span!("registry.refresh_all", remove_dead).entered();

        let records = probe.enumerate_processes(None, config)?;
        let generation = self.next_generation();
        let mut report = self.reconcile(records, generation);

        if remove_dead {
            let dead: Vec<u32> = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.last_seen != generation)
                .map(|(&pid, _)| pid)
                .collect();
            report.removed.extend(self.remove(dead));
        }

        finish(&mut report);
        debug!(
            observed = report.observed,
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            total = self.entries.len(),
            "full process refresh"
        );
        Ok(report)
    }

    /// Refreshes only the processes in `pids`.
    ///
    /// Processes outside the set are never touched. A PID in the set that no
    /// longer exists is not counted, and is pruned only when `remove_dead` is
    /// set.
    pub fn refresh_specific<P: PlatformProbe + ?Sized>(
        &mut self,
        probe: &mut P,
        pids: &[u32],
        remove_dead: bool,
        config: &ProcessRefreshConfig,
    ) -> ProbeResult<RefreshReport> {
        let _span =
            tracing::debug_span!("registry.refresh_specific", requested = pids.len(), remove_dead)
                .entered();

        let mut wanted = pids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(RefreshReport::default());
        }

        let records = probe.enumerate_processes(Some(&wanted), config)?;
        let generation = self.next_generation();
        let records = records
            .into_iter()
            .filter(|record| wanted.binary_search(&record.pid).is_ok());
        let mut report = self.reconcile(records, generation);

        if remove_dead {
            let dead: Vec<u32> = wanted
                .iter()
                .copied()
                .filter(|pid| {
                    self.entries
                        .get(pid)
                        .is_some_and(|entry| entry.last_seen != generation)
                })
                .collect();
            report.removed.extend(self.remove(dead));
        }

        finish(&mut report);
        debug!(
            requested = wanted.len(),
            observed = report.observed,
            removed = report.removed.len(),
            "specific process refresh"
        );
        Ok(report)
    }

    pub fn get(&self, pid: u32) -> Option<&Process> {
        self.entries.get(&pid).map(|entry| &entry.process)
    }

    /// Processes whose name contains `pattern`, case-sensitively, ordered by
    /// PID. An empty pattern matches every process.
    pub fn by_name(&self, pattern: &str) -> Vec<&Process> {
        let mut matches: Vec<&Process> = self
            .iter()
            .filter(|process| process.name.contains(pattern))
            .collect();
        matches.sort_unstable_by_key(|process| process.pid);
        matches
    }

    /// All known processes, ordered by PID.
    pub fn processes(&self) -> Vec<&Process> {
        let mut all: Vec<&Process> = self.iter().collect();
        all.sort_unstable_by_key(|process| process.pid);
        all
    }

    /// All known processes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.entries.values().map(|entry| &entry.process)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of refreshes applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn reconcile(
        &mut self,
        records: impl IntoIterator<Item = ProcessRecord>,
        generation: u64,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();

        for record in records {
            let pid = record.pid;
            match self.entries.get_mut(&pid) {
                Some(entry) => {
                    // A second row for the same PID in one pass overwrites the
                    // first; it is not counted twice.
                    let repeated = entry.last_seen == generation;
                    entry.last_seen = generation;
                    if repeated {
                        merge(&mut entry.process, record);
                        trace!(pid, "duplicate row in one pass");
                        continue;
                    }
                    report.observed += 1;

                    // Same PID, different start time: the old process is gone
                    // and nothing it left behind carries over.
                    if entry.process.start_time != record.start_time {
                        trace!(
                            pid,
                            old = entry.process.start_time,
                            new = record.start_time,
                            "pid reused"
                        );
                        let mut process = Process::new(pid);
                        merge(&mut process, record);
                        entry.process = process;
                        report.removed.push(pid);
                        report.added.push(pid);
                        continue;
                    }

                    if merge(&mut entry.process, record) {
                        report.updated.push(pid);
                    }
                }
                None => {
                    let mut process = Process::new(pid);
                    merge(&mut process, record);
                    trace!(pid, name = %process.name, "new process");
                    self.entries.insert(
                        pid,
                        Entry {
                            process,
                            last_seen: generation,
                        },
                    );
                    report.observed += 1;
                    report.added.push(pid);
                }
            }
        }

        report
    }

    fn remove(&mut self, pids: Vec<u32>) -> Vec<u32> {
        pids.into_iter()
            .filter(|pid| self.entries.remove(pid).is_some())
            .inspect(|pid| trace!(pid, "pruned dead process"))
            .collect()
    }
}

fn finish(report: &mut RefreshReport) {
    report.added.sort_unstable();
    report.updated.sort_unstable();
    report.removed.sort_unstable();
}

/// Applies one probe row to a process. Returns whether anything changed.
fn merge(process: &mut Process, record: ProcessRecord) -> bool {
    let mut changed = false;

    changed |= assign(&mut process.name, record.name);
    changed |= assign(&mut process.parent, record.parent);
    changed |= assign(&mut process.status, record.status);
    changed |= assign(&mut process.start_time, record.start_time);
    changed |= assign(&mut process.run_time, record.run_time);
    changed |= assign(&mut process.session_id, record.session_id);

    changed |= apply(&mut process.memory, record.memory);
    changed |= apply(&mut process.virtual_memory, record.virtual_memory);
    changed |= apply(&mut process.cpu_usage, record.cpu_usage);
    changed |= apply(&mut process.disk_usage, record.disk_usage);
    changed |= apply(&mut process.cmd, record.cmd);
    changed |= apply(&mut process.environ, record.environ);

    changed |= apply_optional(&mut process.exe, record.exe);
    changed |= apply_optional(&mut process.cwd, record.cwd);
    changed |= apply_optional(&mut process.root, record.root);
    changed |= apply_optional(&mut process.user_id, record.user_id);
    changed |= apply_optional(&mut process.effective_user_id, record.effective_user_id);
    changed |= apply_optional(&mut process.group_id, record.group_id);
    changed |= apply_optional(&mut process.effective_group_id, record.effective_group_id);
    changed |= apply_optional(&mut process.tasks, record.tasks);

    changed
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn apply<T: PartialEq>(slot: &mut T, probed: Probed<T>) -> bool {
    match probed {
        Probed::Value(value) => assign(slot, value),
        Probed::Skipped | Probed::Unavailable => false,
    }
}

fn apply_optional<T: PartialEq>(slot: &mut Option<T>, probed: Probed<T>) -> bool {
    match probed {
        Probed::Value(value) => assign(slot, Some(value)),
        Probed::Skipped | Probed::Unavailable => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::mock::{MockProbe, full_record};

    fn everything() -> ProcessRefreshConfig {
        ProcessRefreshConfig::everything()
    }

    fn probe_with(pids: &[u32]) -> MockProbe {
        let mut probe = MockProbe::new();
        for &pid in pids {
            probe.spawn(full_record(pid, Some(1), &format!("proc-{pid}")));
        }
        probe
    }

    #[test]
    fn first_refresh_adds_everything() {
        let mut probe = probe_with(&[1, 2, 3]);
        let mut registry = ProcessRegistry::new();

        let report = registry.refresh_all(&mut probe, true, &everything()).unwrap();

        assert_eq!(report.observed, 3);
        assert_eq!(report.added, vec![1, 2, 3]);
        assert!(report.updated.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn pruning_is_opt_in() {
        let mut probe = probe_with(&[1, 2, 3]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.exit(2);
        let report = registry.refresh_all(&mut probe, false, &everything()).unwrap();
        assert_eq!(report.observed, 2);
        assert!(report.removed.is_empty());
        assert!(registry.get(2).is_some(), "stale entry kept without pruning");

        let report = registry.refresh_all(&mut probe, true, &everything()).unwrap();
        assert_eq!(report.removed, vec![2]);
        assert!(registry.get(2).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn disabled_fields_keep_previous_values() {
        let mut probe = probe_with(&[10]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();
        let original_cmd = registry.get(10).unwrap().cmd().to_vec();
        assert!(!original_cmd.is_empty());

        probe.update(10, |record| {
            record.cmd = Probed::Value(vec!["changed".into()]);
            record.memory = Probed::Value(999);
        });
        let config = ProcessRefreshConfig {
            cmd: false,
            ..everything()
        };
        let report = registry.refresh_all(&mut probe, true, &config).unwrap();

        let process = registry.get(10).unwrap();
        assert_eq!(process.cmd(), original_cmd.as_slice());
        assert_eq!(process.memory(), 999);
        assert_eq!(report.updated, vec![10]);
    }

    #[test]
    fn unavailable_fields_do_not_blank_known_values() {
        let mut probe = probe_with(&[10]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();
        let exe = registry.get(10).unwrap().exe().map(str::to_owned);
        assert!(exe.is_some());

        probe.update(10, |record| {
            record.exe = Probed::Unavailable;
            record.environ = Probed::Unavailable;
        });
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        let process = registry.get(10).unwrap();
        assert_eq!(process.exe().map(str::to_owned), exe);
        assert!(!process.environ().is_empty());
    }

    #[test]
    fn permission_denied_fields_stay_absent_for_new_process() {
        let mut record = ProcessRecord::new(77, "kworker/0:1");
        record.exe = Probed::Unavailable;
        record.cwd = Probed::Unavailable;
        record.memory = Probed::Value(0);
        let mut probe = MockProbe::new();
        probe.spawn(record);

        let mut registry = ProcessRegistry::new();
        let report = registry.refresh_all(&mut probe, true, &everything()).unwrap();

        assert_eq!(report.observed, 1);
        let process = registry.get(77).unwrap();
        assert!(process.exe().is_none());
        assert!(process.cwd().is_none());
        assert_eq!(process.name(), "kworker/0:1");
    }

    #[test]
    fn duplicate_rows_later_wins_and_count_once() {
        let mut probe = probe_with(&[5]);
        let mut again = full_record(5, Some(1), "proc-5");
        again.memory = Probed::Value(4242);
        probe.push_extra_row(again);

        let mut registry = ProcessRegistry::new();
        let report = registry.refresh_all(&mut probe, true, &everything()).unwrap();

        assert_eq!(report.observed, 1);
        assert_eq!(report.added, vec![5]);
        assert!(report.updated.is_empty());
        assert_eq!(registry.get(5).unwrap().memory(), 4242);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reused_pid_replaces_the_old_process() {
        let mut probe = probe_with(&[10, 11]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.exit(10);
        let mut successor = ProcessRecord::new(10, "new-shell");
        successor.start_time = 1_800_000_000;
        successor.memory = Probed::Value(512);
        successor.exe = Probed::Value("/bin/new-shell".into());
        successor.cmd = Probed::Value(vec!["new-shell".into()]);
        probe.spawn(successor);

        let config = ProcessRefreshConfig {
            cmd: false,
            exe: false,
            ..everything()
        };
        let report = registry.refresh_all(&mut probe, true, &config).unwrap();

        let process = registry.get(10).unwrap();
        assert_eq!(process.name(), "new-shell");
        assert_eq!(process.start_time(), 1_800_000_000);
        assert_eq!(process.exe(), None);
        assert!(process.cmd().is_empty());
        assert!(process.environ().is_empty());
        assert_eq!(report.observed, 2);
        assert_eq!(report.added, vec![10]);
        assert_eq!(report.removed, vec![10]);
        assert!(report.updated.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn specific_refresh_detects_reused_pid() {
        let mut probe = probe_with(&[1, 2]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.update(2, |record| {
            record.name = "other".into();
            record.start_time += 60;
        });
        let report = registry
            .refresh_specific(&mut probe, &[2], true, &everything())
            .unwrap();

        assert_eq!(report.added, vec![2]);
        assert_eq!(report.removed, vec![2]);
        assert_eq!(registry.get(2).unwrap().name(), "other");
    }

    #[test]
    fn specific_refresh_leaves_other_processes_alone() {
        let mut probe = probe_with(&[1, 2, 3]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();
        let untouched = registry.get(3).unwrap().clone();

        probe.update(1, |record| record.cpu_usage = Probed::Value(80.0));
        probe.update(3, |record| record.cpu_usage = Probed::Value(55.0));
        probe.exit(2);

        let report = registry
            .refresh_specific(&mut probe, &[1, 2], true, &everything())
            .unwrap();

        assert_eq!(report.observed, 1);
        assert_eq!(report.updated, vec![1]);
        assert_eq!(report.removed, vec![2]);
        assert_eq!(registry.get(1).unwrap().cpu_usage(), 80.0);
        assert_eq!(registry.get(3).unwrap(), &untouched);
    }

    #[test]
    fn specific_refresh_without_pruning_keeps_missing_pid() {
        let mut probe = probe_with(&[1, 2]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.exit(2);
        let report = registry
            .refresh_specific(&mut probe, &[2, 2, 999], false, &everything())
            .unwrap();

        assert_eq!(report.observed, 0);
        assert!(report.removed.is_empty());
        assert!(registry.get(2).is_some());
        assert!(registry.get(999).is_none());
    }

    #[test]
    fn specific_refresh_can_discover_new_process() {
        let mut probe = probe_with(&[1]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.spawn(full_record(40, Some(1), "late"));
        let report = registry
            .refresh_specific(&mut probe, &[40], true, &everything())
            .unwrap();

        assert_eq!(report.added, vec![40]);
        assert_eq!(registry.get(40).unwrap().name(), "late");
    }

    #[test]
    fn empty_pid_set_is_a_no_op() {
        let mut probe = probe_with(&[1]);
        let mut registry = ProcessRegistry::new();
        let report = registry
            .refresh_specific(&mut probe, &[], true, &everything())
            .unwrap();
        assert_eq!(report, RefreshReport::default());
        assert_eq!(probe.enumerate_calls(), 0);
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn probe_failure_leaves_registry_untouched() {
        let mut probe = probe_with(&[1, 2]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        probe.exit(1);
        probe.fail_next(crate::system::probe::ProbeError::Query {
            what: "process table",
            reason: "EIO".into(),
        });
        assert!(registry.refresh_all(&mut probe, true, &everything()).is_err());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn name_lookup_is_case_sensitive_substring() {
        let mut probe = MockProbe::new();
        probe.spawn(full_record(3, None, "postgres"));
        probe.spawn(full_record(1, None, "postgres: writer"));
        probe.spawn(full_record(2, None, "Postgres.app"));
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, true, &everything()).unwrap();

        let pids: Vec<u32> = registry.by_name("postgres").iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![1, 3]);
        assert!(registry.by_name("nonexistent-xyz-123").is_empty());
        assert_eq!(registry.by_name("").len(), 3);
    }

    #[test]
    fn unchanged_rows_are_not_reported_as_updated() {
        let mut probe = probe_with(&[1, 2]);
        let mut registry = ProcessRegistry::new();
        registry.refresh_all(&mut probe, false, &everything()).unwrap();
        let report = registry.refresh_all(&mut probe, false, &everything()).unwrap();
        assert_eq!(report.observed, 2);
        assert!(report.added.is_empty());
        assert!(report.updated.is_empty());
    }
}
