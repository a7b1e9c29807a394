use serde::{Deserialize, Serialize};

/// Integer width used to sum partial products before the final narrowing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccumulationWidth {
    /// Wrapping i32 accumulation seeded with the bias; nothing is checked
    /// before the narrowing store.
    #[default]
    Fast32,
    /// i64 accumulation, saturated to i32 after every partial-sum block.
    Exact64,
}

/// Number of i32 lanes processed per step. Results never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorWidth {
    Scalar,
    Width128,
    Width256,
}

impl VectorWidth {
    pub const ALL: [VectorWidth; 3] = [VectorWidth::Scalar, VectorWidth::Width128, VectorWidth::Width256];

    pub fn lanes(self) -> usize {
        match self {
            VectorWidth::Scalar => 1,
            VectorWidth::Width128 => 4,
            VectorWidth::Width256 => 8,
        }
    }

    /// Widest level the running CPU supports.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") { return VectorWidth::Width256; }
            if is_x86_feature_detected!("sse4.1") { return VectorWidth::Width128; }
            VectorWidth::Scalar
        }
        #[cfg(target_arch = "aarch64")]
        {
            VectorWidth::Width128
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            VectorWidth::Scalar
        }
    }
}

impl Default for VectorWidth {
    fn default() -> Self { Self::detect() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub accumulation: AccumulationWidth,
    pub vector: VectorWidth,
}

impl KernelConfig {
    pub fn new(accumulation: AccumulationWidth, vector: VectorWidth) -> Self { Self { accumulation, vector } }

    /// Every accumulation/vector combination, for conformance sweeps.
    pub fn all() -> Vec<KernelConfig> {
        let mut out = Vec::with_capacity(6);
        for accumulation in [AccumulationWidth::Fast32, AccumulationWidth::Exact64] {
            for vector in VectorWidth::ALL { out.push(KernelConfig { accumulation, vector }); }
        }
        out
    }
}
