//! Configuration (§4.10 ambient component): the settings bundle the
//! orchestrator needs before it can open a device and start transmitting,
//! built explicitly ahead of time rather than threaded through as loose
//! arguments — the same shape the teacher's `live_adsr` example uses to
//! assemble a device/config pair before spawning audio threads.

use crate::effects::EffectParams;

/// Everything [`crate::orchestrator::transmit`] needs to know up front.
#[derive(Debug, Clone)]
pub struct TransmitSettings {
    pub mode_name: String,
    /// Only consulted when `mode_name` is `"native"`.
    pub native_dims: Option<(u32, u32)>,
    pub sample_rate: u32,
    /// Ring buffer capacity in samples, shared between the player and the
    /// streaming decoder.
    pub ring_capacity: usize,
    /// Effect parameters to seed the pipeline with before the first chunk
    /// plays, rather than starting from [`EffectParams::default`] and
    /// immediately pushing updates through the channel.
    pub initial_params: EffectParams,
}

impl Default for TransmitSettings {
    fn default() -> Self {
        Self {
            mode_name: "MartinM1".to_string(),
            native_dims: None,
            sample_rate: crate::modes::SAMPLE_RATE,
            ring_capacity: crate::modes::SAMPLE_RATE as usize * 4,
            initial_params: EffectParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_name_martin_m1() {
        let settings = TransmitSettings::default();
        assert_eq!(settings.mode_name, "MartinM1");
        assert_eq!(settings.sample_rate, 44_100);
    }
}
