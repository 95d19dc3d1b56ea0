use super::Identity;

macro_rules! aarch64_flags {
    ($($name:ident => $feature:tt),* $(,)?) => {
        feature_flags! { $($name),* }

        pub(super) fn detect() -> CpuFeatureFlags {
            CpuFeatureFlags {
                $($name: std::arch::is_aarch64_feature_detected!($feature),)*
            }
        }
    };
}

aarch64_flags! {
    asimd => "asimd",
    pmull => "pmull",
    fp => "fp",
    fp16 => "fp16",
    sve => "sve",
    crc => "crc",
    lse => "lse",
    lse2 => "lse2",
    rdm => "rdm",
    rcpc => "rcpc",
    rcpc2 => "rcpc2",
    dotprod => "dotprod",
    tme => "tme",
    fhm => "fhm",
    dit => "dit",
    flagm => "flagm",
    ssbs => "ssbs",
    sb => "sb",
    paca => "paca",
    pacg => "pacg",
    dpb => "dpb",
    dpb2 => "dpb2",
    sve2 => "sve2",
    sve2_aes => "sve2-aes",
    sve2_sm4 => "sve2-sm4",
    sve2_sha3 => "sve2-sha3",
    sve2_bitperm => "sve2-bitperm",
    frintts => "frintts",
    i8mm => "i8mm",
    f32mm => "f32mm",
    f64mm => "f64mm",
    bf16 => "bf16",
    rand => "rand",
    bti => "bti",
    mte => "mte",
    jsconv => "jsconv",
    fcma => "fcma",
    aes => "aes",
    sha2 => "sha2",
    sha3 => "sha3",
    sm4 => "sm4",
}

/// No CPUID equivalent is readable from user space; the brand comes from the
/// CPU table instead.
pub(super) fn identity() -> Identity {
    Identity::default()
}
