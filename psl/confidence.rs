use num_traits::ToPrimitive;

/// The Wilson score interval for a binomial proportion with `successes` out of `n` trials at the two sided `confidence` level. Returns `(0, 1)` when `n` is zero.
pub fn wilson_interval(successes: usize, n: usize, confidence: f64) -> (f64, f64) {
	if n == 0 {
		return (0.0, 1.0);
	}
	let n = n.to_f64().unwrap();
	let p = successes.to_f64().unwrap() / n;
	let confidence = confidence.max(0.0).min(1.0 - 1e-12);
	let z = normal_quantile(0.5 + confidence / 2.0);
	let z2 = z * z;
	let denominator = 1.0 + z2 / n;
	let center = (p + z2 / (2.0 * n)) / denominator;
	let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;
	((center - half_width).max(0.0), (center + half_width).min(1.0))
}

/// The quantile function of the standard normal distribution, using the rational approximation of Acklam with a relative error below `1.2e-9`.
pub fn normal_quantile(p: f64) -> f64 {
	const A: [f64; 6] = [
		-3.969_683_028_665_376e1,
		2.209_460_984_245_205e2,
		-2.759_285_104_469_687e2,
		1.383_577_518_672_69e2,
		-3.066_479_806_614_716e1,
		2.506_628_277_459_239,
	];
	const B: [f64; 5] = [
		-5.447_609_879_822_406e1,
		1.615_858_368_580_409e2,
		-1.556_989_798_598_866e2,
		6.680_131_188_771_972e1,
		-1.328_068_155_288_572e1,
	];
	const C: [f64; 6] = [
		-7.784_894_002_430_293e-3,
		-3.223_964_580_411_365e-1,
		-2.400_758_277_161_838,
		-2.549_732_539_343_734,
		4.374_664_141_464_968,
		2.938_163_982_698_783,
	];
	const D: [f64; 4] = [
		7.784_695_709_041_462e-3,
		3.224_671_290_700_398e-1,
		2.445_134_137_142_996,
		3.754_408_661_907_416,
	];
	const P_LOW: f64 = 0.02425;
	if p <= 0.0 {
		return std::f64::NEG_INFINITY;
	}
	if p >= 1.0 {
		return std::f64::INFINITY;
	}
	if p < P_LOW {
		let q = (-2.0 * p.ln()).sqrt();
		(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
			/ ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
	} else if p <= 1.0 - P_LOW {
		let q = p - 0.5;
		let r = q * q;
		(((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
			/ (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
	} else {
		-normal_quantile(1.0 - p)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_normal_quantile() {
		assert!(normal_quantile(0.5).abs() < 1e-9);
		assert!((normal_quantile(0.975) - 1.959_963_985).abs() < 1e-6);
		assert!((normal_quantile(0.01) + 2.326_347_874).abs() < 1e-6);
	}

	#[test]
	fn test_wilson_interval() {
		let (low, high) = wilson_interval(5, 10, 0.95);
		assert!((low - 0.236_593).abs() < 1e-4);
		assert!((high - 0.763_407).abs() < 1e-4);
		let (narrow_low, narrow_high) = wilson_interval(5, 10, 0.5);
		assert!(narrow_low > low && narrow_high < high);
		assert_eq!(wilson_interval(0, 0, 0.95), (0.0, 1.0));
		let (low, _) = wilson_interval(0, 10, 0.95);
		assert_eq!(low, 0.0);
	}
}
