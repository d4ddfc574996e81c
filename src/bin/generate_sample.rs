use std::fmt::Write as _;

use anyhow::{Context, Result};

/// Square-law MOSFET drain current with channel-length modulation.
fn drain_current(vg: f64, vd: f64, vth: f64, k: f64, lambda: f64) -> f64 {
    let vov = vg - vth;
    if vov <= 0.0 {
        return 1e-12;
    }
    let id = if vd < vov {
        k * (vov * vd - 0.5 * vd * vd)
    } else {
        0.5 * k * vov * vov
    };
    id * (1.0 + lambda * vd)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in [-1, 1).
    fn jitter(&mut self) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        unit * 2.0 - 1.0
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_idvd.mdm".to_string());

    let mut rng = SimpleRng::new(42);

    // Vd: 0 → 3 V in 31 points (VAR1), Vg: 0.5 → 2.0 V in 4 steps (VAR2)
    let vd_points: Vec<f64> = (0..31).map(|i| i as f64 * 0.1).collect();
    let vg_steps = [0.5, 1.0, 1.5, 2.0];
    let (vth, k, lambda) = (0.45, 2.0e-4, 0.05);

    let mut out = String::new();
    writeln!(out, "! VERSION = 6.00")?;
    writeln!(out, "BEGIN_HEADER")?;
    writeln!(out, " ICCAP_INPUTS")?;
    writeln!(out, "  Vd V D GROUND SMU2 0.1 LIN 1 0 3 31 0.1")?;
    writeln!(out, "  Vg V G GROUND SMU1 0.1 LIST 2 4 0.5 1 1.5 2")?;
    writeln!(out, "  Vs V S GROUND GROUND 0 CON 0")?;
    writeln!(out, " ICCAP_OUTPUTS")?;
    writeln!(out, "  Id I D GROUND SMU2 B")?;
    writeln!(out, " ICCAP_VALUES")?;
    writeln!(out, "  TEMP \"27\"")?;
    writeln!(out, "  W \"1e-5\"")?;
    writeln!(out, "  L \"1.8e-7\"")?;
    writeln!(out, "  DEVICE \"nmos_sample\"")?;
    writeln!(out, "END_HEADER")?;

    for &vg in &vg_steps {
        writeln!(out)?;
        writeln!(out, "BEGIN_DB")?;
        writeln!(out, " ICCAP_VAR Vg {vg}")?;
        writeln!(out, " ICCAP_VAR Vs 0")?;
        writeln!(out)?;
        writeln!(out, " #Vd Id")?;
        for &vd in &vd_points {
            let id = drain_current(vg, vd, vth, k, lambda) * (1.0 + 0.01 * rng.jitter());
            writeln!(out, " {vd:.6E} {id:.6E}")?;
        }
        writeln!(out, "END_DB")?;
    }

    std::fs::write(&output_path, out)
        .with_context(|| format!("writing {output_path}"))?;

    println!(
        "Wrote {} blocks ({} points each) to {output_path}",
        vg_steps.len(),
        vd_points.len()
    );
    Ok(())
}
