use super::Identity;

feature_flags! {}

pub(super) fn detect() -> CpuFeatureFlags {
    CpuFeatureFlags::default()
}

pub(super) fn identity() -> Identity {
    Identity::default()
}
