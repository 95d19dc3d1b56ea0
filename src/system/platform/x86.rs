use std::arch::is_x86_feature_detected;

use raw_cpuid::CpuId;

use super::Identity;

feature_flags! {
    fpu,
    tsc,
    mmx,
    fxsr,
    sse,
    sse2,
    sse3,
    ssse3,
    sse4_1,
    sse4_2,
    sse4a,
    pclmulqdq,
    aes,
    rdrand,
    rdseed,
    sha,
    popcnt,
    lzcnt,
    abm,
    tbm,
    bmi1,
    bmi2,
    adx,
    fma,
    f16c,
    cmpxchg16b,
    xsave,
    xsaveopt,
    xsavec,
    xsaves,
    rtm,
    avx,
    avx2,
    avx512f,
    avx512dq,
    avx512ifma,
    avx512pf,
    avx512er,
    avx512cd,
    avx512bw,
    avx512vl,
    avx512vbmi,
    avx512vbmi2,
    avx512vnni,
    avx512bitalg,
    avx512vpopcntdq,
    avx512bf16,
    avx512vp2intersect,
    avx512gfni,
    avx512vaes,
    avx512vpclmulqdq,
}

pub(super) fn detect() -> CpuFeatureFlags {
    let cpuid = CpuId::new();
    let fpu = cpuid.get_feature_info().is_some_and(|info| info.has_fpu());
    let extended = cpuid.get_extended_feature_info();
    let avx512f = is_x86_feature_detected!("avx512f");

    CpuFeatureFlags {
        fpu,
        tsc: is_x86_feature_detected!("tsc"),
        mmx: is_x86_feature_detected!("mmx"),
        fxsr: is_x86_feature_detected!("fxsr"),
        sse: is_x86_feature_detected!("sse"),
        sse2: is_x86_feature_detected!("sse2"),
        sse3: is_x86_feature_detected!("sse3"),
        ssse3: is_x86_feature_detected!("ssse3"),
        sse4_1: is_x86_feature_detected!("sse4.1"),
        sse4_2: is_x86_feature_detected!("sse4.2"),
        sse4a: is_x86_feature_detected!("sse4a"),
        pclmulqdq: is_x86_feature_detected!("pclmulqdq"),
        aes: is_x86_feature_detected!("aes"),
        rdrand: is_x86_feature_detected!("rdrand"),
        rdseed: is_x86_feature_detected!("rdseed"),
        sha: is_x86_feature_detected!("sha"),
        popcnt: is_x86_feature_detected!("popcnt"),
        lzcnt: is_x86_feature_detected!("lzcnt"),
        abm: is_x86_feature_detected!("abm"),
        tbm: is_x86_feature_detected!("tbm"),
        bmi1: is_x86_feature_detected!("bmi1"),
        bmi2: is_x86_feature_detected!("bmi2"),
        adx: is_x86_feature_detected!("adx"),
        fma: is_x86_feature_detected!("fma"),
        f16c: is_x86_feature_detected!("f16c"),
        cmpxchg16b: is_x86_feature_detected!("cmpxchg16b"),
        xsave: is_x86_feature_detected!("xsave"),
        xsaveopt: is_x86_feature_detected!("xsaveopt"),
        xsavec: is_x86_feature_detected!("xsavec"),
        xsaves: is_x86_feature_detected!("xsaves"),
        // std has no stable runtime check for these three.
        rtm: extended.as_ref().is_some_and(|ext| ext.has_rtm()),
        avx512pf: avx512f && extended.as_ref().is_some_and(|ext| ext.has_avx512pf()),
        avx512er: avx512f && extended.as_ref().is_some_and(|ext| ext.has_avx512er()),
        avx: is_x86_feature_detected!("avx"),
        avx2: is_x86_feature_detected!("avx2"),
        avx512f,
        avx512dq: is_x86_feature_detected!("avx512dq"),
        avx512ifma: is_x86_feature_detected!("avx512ifma"),
        avx512cd: is_x86_feature_detected!("avx512cd"),
        avx512bw: is_x86_feature_detected!("avx512bw"),
        avx512vl: is_x86_feature_detected!("avx512vl"),
        avx512vbmi: is_x86_feature_detected!("avx512vbmi"),
        avx512vbmi2: is_x86_feature_detected!("avx512vbmi2"),
        avx512vnni: is_x86_feature_detected!("avx512vnni"),
        avx512bitalg: is_x86_feature_detected!("avx512bitalg"),
        avx512vpopcntdq: is_x86_feature_detected!("avx512vpopcntdq"),
        avx512bf16: is_x86_feature_detected!("avx512bf16"),
        avx512vp2intersect: is_x86_feature_detected!("avx512vp2intersect"),
        avx512gfni: avx512f && is_x86_feature_detected!("gfni"),
        avx512vaes: avx512f && is_x86_feature_detected!("vaes"),
        avx512vpclmulqdq: avx512f && is_x86_feature_detected!("vpclmulqdq"),
    }
}

pub(super) fn identity() -> Identity {
    let cpuid = CpuId::new();
    let info = cpuid.get_feature_info();
    let brand = cpuid
        .get_processor_brand_string()
        .map(|brand| brand.as_str().trim().to_string())
        .filter(|brand| !brand.is_empty());

    Identity {
        brand,
        family: info.as_ref().map(|info| u32::from(info.family_id())),
        model: info.as_ref().map(|info| u32::from(info.model_id())),
        stepping_id: info.as_ref().map(|info| u32::from(info.stepping_id())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_agree_with_std_detection() {
        let flags = detect();
        assert_eq!(flags.sse2, is_x86_feature_detected!("sse2"));
        assert_eq!(flags.sse4_2, is_x86_feature_detected!("sse4.2"));
        assert_eq!(flags.avx, is_x86_feature_detected!("avx"));
        assert_eq!(flags.avx2, is_x86_feature_detected!("avx2"));
        assert_eq!(flags.aes, is_x86_feature_detected!("aes"));
        assert_eq!(flags.popcnt, is_x86_feature_detected!("popcnt"));
        assert_eq!(flags.bmi2, is_x86_feature_detected!("bmi2"));
        assert_eq!(flags.avx512f, is_x86_feature_detected!("avx512f"));
    }

    #[test]
    fn identity_matches_cpuid_leaves() {
        let cpuid = CpuId::new();
        let identity = identity();
        let info = cpuid.get_feature_info();
        assert_eq!(
            identity.family,
            info.as_ref().map(|i| u32::from(i.family_id()))
        );
        assert_eq!(identity.model, info.as_ref().map(|i| u32::from(i.model_id())));
        assert_eq!(
            identity.stepping_id,
            info.as_ref().map(|i| u32::from(i.stepping_id()))
        );
        if let Some(brand) = &identity.brand {
            assert_eq!(brand, brand.trim());
            assert!(!brand.is_empty());
        }
    }

    #[test]
    fn fpu_follows_leaf_one() {
        let expected = CpuId::new()
            .get_feature_info()
            .is_some_and(|info| info.has_fpu());
        assert_eq!(detect().fpu, expected);
    }

    #[test]
    fn avx512_extensions_require_foundation() {
        let flags = detect();
        if !flags.avx512f {
            assert!(!flags.avx512gfni);
            assert!(!flags.avx512vaes);
            assert!(!flags.avx512vpclmulqdq);
            assert!(!flags.avx512er);
            assert!(!flags.avx512pf);
        }
    }
}
