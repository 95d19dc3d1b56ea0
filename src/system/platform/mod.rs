//! Instruction-set capability detection.
//!
//! Each supported architecture gets its own flag set; everything else gets an
//! empty one. This is the only place in the crate allowed to branch on
//! `target_arch`.

use serde::Serialize;

/// Declares a `CpuFeatureFlags` struct with one `bool` per feature.
macro_rules! feature_flags {
    ($($name:ident),* $(,)?) => {
        /// Instruction-set extensions available on this CPU and enabled by the OS.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
        pub struct CpuFeatureFlags {
            $(pub $name: bool,)*
        }

        impl CpuFeatureFlags {
            /// Names of the enabled features, in declaration order.
            #[allow(unused_mut)]
            pub fn enabled(&self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.$name {
                        names.push(stringify!($name));
                    }
                )*
                names
            }
        }
    };
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use x86 as arch_impl;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
use aarch64 as arch_impl;

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
mod other;
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
use other as arch_impl;

pub use arch_impl::CpuFeatureFlags;

/// CPU identity fields an architecture may expose.
#[derive(Debug, Default)]
struct Identity {
    brand: Option<String>,
    family: Option<u32>,
    model: Option<u32>,
    stepping_id: Option<u32>,
}

/// Capabilities and identity of the CPU the process runs on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CpuFeatures {
    pub arch: String,
    pub brand: Option<String>,
    pub family: Option<u32>,
    pub model: Option<u32>,
    pub stepping_id: Option<u32>,
    pub flags: CpuFeatureFlags,
}

impl CpuFeatures {
    pub fn enabled_flags(&self) -> Vec<&'static str> {
        self.flags.enabled()
    }
}

/// Detects the running CPU's capabilities.
///
/// Stateless and infallible: anything the CPU does not report is `false` or
/// `None`.
pub fn detect_cpu_features() -> CpuFeatures {
    let identity = arch_impl::identity();
    CpuFeatures {
        arch: std::env::consts::ARCH.to_string(),
        brand: identity.brand,
        family: identity.family,
        model: identity.model,
        stepping_id: identity.stepping_id,
        flags: arch_impl::detect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_matches_build_target() {
        assert_eq!(detect_cpu_features().arch, std::env::consts::ARCH);
    }

    #[test]
    fn detection_is_repeatable() {
        assert_eq!(detect_cpu_features(), detect_cpu_features());
    }

    #[test]
    fn enabled_names_match_set_flags() {
        let features = detect_cpu_features();
        let enabled = features.enabled_flags();
        let mut sorted = enabled.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), enabled.len());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn x86_64_baseline_is_reported() {
        let features = detect_cpu_features();
        assert!(features.flags.sse2);
        assert!(features.flags.fxsr);
        assert!(features.enabled_flags().contains(&"sse2"));
        assert!(features.family.is_some());
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn aarch64_reports_no_cpuid_signature() {
        let features = detect_cpu_features();
        assert!(features.flags.asimd);
        assert!(features.family.is_none());
    }
}
