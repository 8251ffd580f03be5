//! Radio Context Tests
//!
//! Band table, VFOs, settings boundary and the PTT edge latch.
//! Run with: cargo test --test context_tests

use sdr_transceiver_dsp::config::PTT_DEBOUNCE_MS;
use sdr_transceiver_dsp::dsp::correction::IqCorrection;
use sdr_transceiver_dsp::dsp::dispatch::NoiseReduction;
use sdr_transceiver_dsp::error::ConfigError;
use sdr_transceiver_dsp::radio::context::RadioContext;
use sdr_transceiver_dsp::radio::ptt::EdgeLatch;
use sdr_transceiver_dsp::types::{Band, DemodMode, RadioState};

// =============================================================================
// Band Table Tests
// =============================================================================

#[test]
fn test_default_context() {
    let ctx = RadioContext::new();
    assert_eq!(ctx.active_vfo(), 0);
    assert_eq!(ctx.active_band(), Band::M40);
    assert_eq!(ctx.demod_mode(), DemodMode::Lsb);
    assert_eq!(ctx.radio_state(), RadioState::SsbReceive);
    assert_eq!(ctx.settings().noise_reduction, NoiseReduction::Off);
    assert!(ctx.settings().sam_fade_leveler);
}

#[test]
fn test_set_demod_mode_resets_passband() {
    let mut ctx = RadioContext::new();
    ctx.band_profile_mut(Band::M40).filter_low_hz = -2_400.0;

    ctx.set_demod_mode(DemodMode::Am);
    let profile = ctx.active_profile();
    assert_eq!(profile.mode, DemodMode::Am);
    assert_eq!((profile.filter_low_hz, profile.filter_high_hz), (-5_000.0, 5_000.0));

    ctx.set_demod_mode(DemodMode::Usb);
    let profile = ctx.active_profile();
    assert_eq!((profile.filter_low_hz, profile.filter_high_hz), (200.0, 3_000.0));

    // Other bands keep their own mode
    assert_eq!(ctx.band_profile(Band::M80).mode, DemodMode::Lsb);
}

#[test]
fn test_iq_correction_is_per_band_and_direction() {
    let mut ctx = RadioContext::new();
    ctx.set_iq_correction(Band::M20, 1.02, -0.01);
    ctx.set_tx_iq_correction(Band::M20, 0.98, 0.03);

    assert_eq!(ctx.iq_correction(Band::M20), IqCorrection::new(1.02, -0.01));
    assert_eq!(ctx.tx_iq_correction(Band::M20), IqCorrection::new(0.98, 0.03));
    for band in Band::ALL.into_iter().filter(|&b| b != Band::M20) {
        assert_eq!(ctx.iq_correction(band), IqCorrection::IDENTITY, "{band:?}");
        assert_eq!(ctx.tx_iq_correction(band), IqCorrection::IDENTITY, "{band:?}");
    }
}

// =============================================================================
// VFO Tests
// =============================================================================

#[test]
fn test_select_vfo() {
    let mut ctx = RadioContext::new();
    assert_eq!(ctx.select_vfo(1), Ok(()));
    assert_eq!(ctx.active_band(), Band::M20);
    assert_eq!(ctx.demod_mode(), DemodMode::Usb);

    assert_eq!(ctx.select_vfo(2), Err(ConfigError::InvalidVfo(2)));
    assert_eq!(ctx.active_vfo(), 1);

    ctx.select_vfo_raw(7);
    assert_eq!(ctx.active_vfo(), 1);
    ctx.select_vfo_raw(0);
    assert_eq!(ctx.active_vfo(), 0);
}

#[test]
fn test_tune_follows_band() {
    let mut ctx = RadioContext::new();
    ctx.tune(14_074_000);
    assert_eq!(ctx.active_band(), Band::M20);
    assert_eq!(ctx.vfo(0).map(|v| v.frequency_hz), Some(14_074_000));

    // Between bands: frequency moves, profile stays
    ctx.tune(12_000_000);
    assert_eq!(ctx.active_band(), Band::M20);
    assert_eq!(ctx.vfo(0).map(|v| v.frequency_hz), Some(12_000_000));

    // VFO B is untouched
    assert_eq!(ctx.vfo(1).map(|v| v.band), Some(Band::M20));
    assert!(ctx.vfo(2).is_none());
}

#[test]
fn test_band_lookup_edges() {
    assert_eq!(Band::from_frequency_hz(7_000_000), Some(Band::M40));
    assert_eq!(Band::from_frequency_hz(7_300_000), Some(Band::M40));
    assert_eq!(Band::from_frequency_hz(7_300_001), None);
    assert_eq!(Band::from_frequency_hz(21_200_000), Some(Band::M15));
    assert_eq!(Band::try_from(5), Ok(Band::M15));
    assert_eq!(Band::try_from(6), Err(ConfigError::InvalidBand(6)));
}

// =============================================================================
// Settings Boundary Tests
// =============================================================================

#[test]
fn test_noise_reduction_raw() {
    let mut ctx = RadioContext::new();
    ctx.configure_noise_reduction_raw(2);
    assert_eq!(ctx.settings().noise_reduction, NoiseReduction::Spectral);

    ctx.configure_noise_reduction_raw(4);
    assert_eq!(ctx.settings().noise_reduction, NoiseReduction::Spectral);

    ctx.configure_noise_reduction(NoiseReduction::Kim);
    assert_eq!(ctx.settings().noise_reduction, NoiseReduction::Kim);
}

#[test]
fn test_config_error_messages() {
    assert_eq!(ConfigError::InvalidAgcMode(9).to_string(), "invalid AGC mode 9");
    assert_eq!(ConfigError::InvalidVfo(3).to_string(), "invalid VFO index 3");
    assert_eq!(DemodMode::try_from(4), Err(ConfigError::InvalidDemodMode(4)));
}

#[test]
fn test_keyer_ignores_ptt_press() {
    let mut ctx = RadioContext::new();
    ctx.set_radio_state(RadioState::CwTransmitKeyer);
    ctx.apply_ptt(true);
    assert_eq!(ctx.radio_state(), RadioState::CwTransmitKeyer);
    ctx.apply_ptt(false);
    assert_eq!(ctx.radio_state(), RadioState::CwReceive);
}

// =============================================================================
// PTT Latch Tests
// =============================================================================

#[test]
fn test_latch_take_clears_pending() {
    let latch = EdgeLatch::default();
    assert!(!latch.take());
    assert!(latch.record_edge(500));
    assert!(latch.take());
    assert!(!latch.take());
    assert!(!latch.is_pending());
}

#[test]
fn test_latch_collapses_edges_between_takes() {
    let latch = EdgeLatch::new(PTT_DEBOUNCE_MS);
    assert!(latch.record_edge(100));
    assert!(latch.record_edge(100 + PTT_DEBOUNCE_MS));
    assert!(latch.take());
    assert!(!latch.take());
    assert_eq!(latch.last_edge_ms(), 100 + PTT_DEBOUNCE_MS);
}

#[test]
fn test_latch_debounce_across_clock_wrap() {
    let latch = EdgeLatch::new(20);
    assert!(latch.record_edge(u32::MAX - 5));
    assert!(!latch.record_edge(10));
    assert!(latch.record_edge(14));
}

#[test]
fn test_latch_accepts_first_edge_anywhere_on_clock() {
    for now in [0, 7, u32::MAX - PTT_DEBOUNCE_MS + 1, u32::MAX] {
        let latch = EdgeLatch::default();
        assert!(latch.record_edge(now), "first edge at {now} was rejected");
        assert!(latch.take());
        assert!(!latch.record_edge(now.wrapping_add(1)), "bounce after {now}");
    }
}

#[test]
fn test_latch_drives_ptt_state() {
    static LATCH: EdgeLatch = EdgeLatch::new(PTT_DEBOUNCE_MS);
    let mut ctx = RadioContext::new();

    let mut pressed = false;
    for (now, level) in [(1_000, true), (1_003, false), (1_004, true), (1_500, false)] {
        if LATCH.record_edge(now) {
            pressed = level;
        }
        if LATCH.take() {
            ctx.apply_ptt(pressed);
        }
        if now == 1_004 {
            // Bounces inside the window did not reach the state
            assert_eq!(ctx.radio_state(), RadioState::SsbTransmit);
        }
    }
    assert_eq!(ctx.radio_state(), RadioState::SsbReceive);
}
