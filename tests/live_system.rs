use std::thread;
use std::time::Duration;

use sysnap::{Config, ProcessRefreshConfig, SysInfo};

fn engine() -> SysInfo {
    SysInfo::with_config(Config::default()).expect("platform supported")
}

#[test]
fn memory_totals_are_consistent() {
    let mut sys = engine();
    sys.refresh_memory().unwrap();
    assert!(sys.total_memory() > 0);
    assert!(sys.total_memory() >= sys.used_memory());
    assert!(sys.total_swap() >= sys.used_swap());
}

#[test]
fn current_process_is_found_after_full_refresh() {
    let mut sys = engine();
    let observed = sys.refresh_processes(Some(true)).unwrap();
    assert_eq!(observed, sys.processes().len());

    let me = std::process::id();
    let process = sys.process_by_pid(me).expect("current process present");
    assert_eq!(process.pid(), me);
    assert!(!process.name().is_empty());
}

#[test]
fn unknown_name_matches_nothing() {
    let mut sys = engine();
    sys.refresh_processes(Some(true)).unwrap();
    assert!(sys.processes_by_name("nonexistent-xyz-123").is_empty());
}

#[test]
fn cpus_are_listed_after_refresh() {
    let mut sys = engine();
    thread::sleep(Duration::from_millis(200));
    sys.refresh_cpu().unwrap();
    assert!(!sys.cpus().is_empty());
    assert_eq!(sys.global_cpu_info().name(), "global");
    for cpu in sys.cpus() {
        assert!(cpu.usage() >= 0.0);
    }
}

#[test]
fn partial_refresh_keeps_earlier_command_line() {
    let mut sys = engine();
    let me = std::process::id();
    sys.refresh_processes_specifics(&[me], Some(true), Some(ProcessRefreshConfig::everything()))
        .unwrap();
    let cmd = sys.process_by_pid(me).unwrap().cmd().to_vec();
    assert!(!cmd.is_empty());

    let without_cmd = ProcessRefreshConfig {
        cmd: false,
        ..ProcessRefreshConfig::everything()
    };
    sys.refresh_processes_specifics(&[me], Some(true), Some(without_cmd))
        .unwrap();
    assert_eq!(sys.process_by_pid(me).unwrap().cmd(), cmd.as_slice());
}

#[test]
fn host_identity_is_populated() {
    let sys = engine();
    assert!(sys.boot_time() > 0);
    assert!(sys.uptime() > 0);
    assert_eq!(sys.cpu_arch(), std::env::consts::ARCH);
    assert!(!sys.distribution().is_empty());
}

#[test]
fn cpu_features_report_build_arch() {
    let sys = engine();
    let features = sys.cpu_features();
    assert_eq!(features.arch, std::env::consts::ARCH);
}

#[cfg(unix)]
#[test]
fn current_user_id_is_numeric() {
    let mut sys = engine();
    let me = std::process::id();
    sys.refresh_processes_specifics(&[me], Some(true), Some(ProcessRefreshConfig::everything()))
        .unwrap();
    let process = sys.process_by_pid(me).unwrap();
    let uid = process.user_id().expect("own uid is readable");
    assert!(uid.parse::<u32>().is_ok(), "uid {uid:?} is not numeric");
    if let Some(gid) = process.group_id() {
        assert!(gid.parse::<u32>().is_ok(), "gid {gid:?} is not numeric");
    }
}

#[test]
fn busy_process_shows_cpu_usage_after_two_samples() {
    let mut sys = engine();
    let me = std::process::id();
    sys.refresh_processes_specifics(&[me], Some(true), None).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_millis(400);
    let mut spins = 0u64;
    while std::time::Instant::now() < deadline {
        spins = std::hint::black_box(spins.wrapping_add(1));
    }

    sys.refresh_processes_specifics(&[me], Some(true), None).unwrap();
    assert!(sys.process_by_pid(me).unwrap().cpu_usage() > 0.0);
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[test]
fn x86_features_agree_with_std_detection() {
    use std::arch::is_x86_feature_detected;

    let features = sysnap::detect_cpu_features();
    let flags = features.flags;
    assert_eq!(flags.sse, is_x86_feature_detected!("sse"));
    assert_eq!(flags.sse3, is_x86_feature_detected!("sse3"));
    assert_eq!(flags.ssse3, is_x86_feature_detected!("ssse3"));
    assert_eq!(flags.sse4_1, is_x86_feature_detected!("sse4.1"));
    assert_eq!(flags.avx2, is_x86_feature_detected!("avx2"));
    assert_eq!(flags.fma, is_x86_feature_detected!("fma"));
    assert_eq!(flags.sha, is_x86_feature_detected!("sha"));
    assert_eq!(flags.lzcnt, is_x86_feature_detected!("lzcnt"));
    assert_eq!(flags.rdrand, is_x86_feature_detected!("rdrand"));
    assert_eq!(flags.xsave, is_x86_feature_detected!("xsave"));
    assert!(features.family.is_some());
    assert!(features.model.is_some());
    assert!(features.stepping_id.is_some());
}

#[test]
fn default_constructor_ignores_user_config_file() {
    let sys = SysInfo::new().expect("platform supported");
    assert_eq!(sys.config(), &Config::default());
}
