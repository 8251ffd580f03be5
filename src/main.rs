//! SDR Transceiver Main Application
//!
//! Entry point for the STM32G474 DSP firmware. Runs the receive/transmit
//! pipeline at the block period on a loopback test tone until the codec
//! driver is wired to the sample queues.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_time::{Duration, Instant, Ticker, Timer};
use heapless::spsc::{Consumer, Producer};
use micromath::F32Ext;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sdr_transceiver_dsp::config::{
    BLOCKS_PER_PASS, NATIVE_SAMPLE_RATE, PASS_PERIOD_US, PTT_DEBOUNCE_MS, SAMPLE_QUEUE_DEPTH,
};
use sdr_transceiver_dsp::dsp::cw::EnvelopeCwDecoder;
use sdr_transceiver_dsp::dsp::io::{
    f32_to_sample, sample_to_f32, CaptureSource, PlaybackSink, QueueCapture, QueueSink, RawBlock,
    SampleQueue,
};
use sdr_transceiver_dsp::dsp::multirate::BiquadFilterBank;
use sdr_transceiver_dsp::dsp::noise_reduction::ReferenceNoiseReducer;
use sdr_transceiver_dsp::dsp::oscillator::QuadratureOscillator;
use sdr_transceiver_dsp::pipeline::{Collaborators, LevelTap, PassOutcome, Pipeline};
use sdr_transceiver_dsp::radio::context::RadioContext;
use sdr_transceiver_dsp::radio::ptt::EdgeLatch;

/// Loopback test tone offset from the dial, in Hz
const TEST_TONE_HZ: f32 = 1_000.0;

/// Loopback test tone amplitude
const TEST_TONE_LEVEL: f32 = 0.05;

static RX_CAPTURE: StaticCell<SampleQueue> = StaticCell::new();
static RX_PLAYBACK: StaticCell<SampleQueue> = StaticCell::new();

static PTT: EdgeLatch = EdgeLatch::new(PTT_DEBOUNCE_MS);
static PTT_PRESSED: AtomicBool = AtomicBool::new(false);

/// Microphone source until the codec driver lands: never has data
struct NoMicrophone;

impl CaptureSource for NoMicrophone {
    fn available(&self) -> usize {
        0
    }

    fn read_block(&mut self) -> Option<RawBlock> {
        None
    }
}

/// Transmit output until the DAC driver lands: accepts and drops
struct TxDiscard;

impl PlaybackSink for TxDiscard {
    fn write_block(&mut self, _block: RawBlock) -> bool {
        true
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SDR Transceiver DSP v{}", env!("CARGO_PKG_VERSION"));

    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    // Status LED (PA5 on Nucleo boards)
    let led = Output::new(p.PA5, Level::Low, Speed::Low);

    // PTT on the user button (PC13, active low)
    let ptt = ExtiInput::new(p.PC13, p.EXTI13, Pull::Up);

    let (capture_tx, capture_rx) = RX_CAPTURE.init_with(SampleQueue::new).split();
    let (playback_tx, playback_rx) = RX_PLAYBACK.init_with(SampleQueue::new).split();

    spawner.spawn(heartbeat_task(led)).unwrap();
    spawner.spawn(ptt_task(ptt)).unwrap();
    spawner.spawn(test_tone_task(capture_tx)).unwrap();
    spawner.spawn(playback_drain_task(playback_rx)).unwrap();
    spawner
        .spawn(dsp_task(QueueCapture::new(capture_rx), QueueSink::new(playback_tx)))
        .unwrap();

    info!("Tasks spawned");

    loop {
        Timer::after(Duration::from_secs(10)).await;
        info!("Main loop tick");
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}

/// PTT edge task: records debounced edges for the DSP loop
#[embassy_executor::task]
async fn ptt_task(mut ptt: ExtiInput<'static>) {
    loop {
        ptt.wait_for_any_edge().await;
        PTT_PRESSED.store(ptt.is_low(), Ordering::Release);
        #[allow(clippy::cast_possible_truncation)]
        let now_ms = Instant::now().as_millis() as u32;
        PTT.record_edge(now_ms);
    }
}

/// Loopback source: a complex test tone at the native rate
#[embassy_executor::task]
async fn test_tone_task(mut producer: Producer<'static, RawBlock, SAMPLE_QUEUE_DEPTH>) {
    let mut osc = QuadratureOscillator::with_frequency(TEST_TONE_HZ, NATIVE_SAMPLE_RATE as f32);
    let mut ticker = Ticker::every(Duration::from_micros(PASS_PERIOD_US));
    loop {
        ticker.next().await;
        for _ in 0..BLOCKS_PER_PASS {
            let mut raw = RawBlock::ZERO;
            for (i, q) in raw.i.iter_mut().zip(raw.q.iter_mut()) {
                let (c, s) = osc.next();
                *i = f32_to_sample(TEST_TONE_LEVEL * c);
                *q = f32_to_sample(TEST_TONE_LEVEL * s);
            }
            if producer.enqueue(raw).is_err() {
                warn!("capture queue full");
                break;
            }
        }
    }
}

/// Playback drain: empties the audio queue and logs the level once a second
#[embassy_executor::task]
async fn playback_drain_task(mut consumer: Consumer<'static, RawBlock, SAMPLE_QUEUE_DEPTH>) {
    let mut ticker = Ticker::every(Duration::from_millis(1000));
    loop {
        ticker.next().await;
        let mut peak = 0.0f32;
        let mut blocks = 0u32;
        while let Some(raw) = consumer.dequeue() {
            blocks += 1;
            for &s in &raw.i {
                peak = peak.max(sample_to_f32(s).abs());
            }
        }
        info!("playback: {} blocks, peak {}", blocks, peak);
    }
}

/// DSP task: one pipeline pass per block period
#[embassy_executor::task]
async fn dsp_task(mut rx_source: QueueCapture<'static>, mut rx_sink: QueueSink<'static>) {
    let mut ctx = RadioContext::new();
    ctx.settings_mut().volume = 80;

    let mut tx_source = NoMicrophone;
    let mut tx_sink = TxDiscard;
    let mut filters = BiquadFilterBank::new();
    let mut noise = ReferenceNoiseReducer::new();
    let mut cw = EnvelopeCwDecoder::new(ctx.settings().cw_pitch_hz);
    let mut tap = LevelTap::default();

    let mut pipeline = Pipeline::new(
        Collaborators {
            rx_source: &mut rx_source,
            rx_sink: &mut rx_sink,
            tx_source: &mut tx_source,
            tx_sink: &mut tx_sink,
            filters: &mut filters,
            noise: &mut noise,
            cw: &mut cw,
            spectrum: Some(&mut tap),
        },
        &ctx,
    );

    let mut ticker = Ticker::every(Duration::from_micros(PASS_PERIOD_US));
    let mut skipped = 0u32;
    loop {
        ticker.next().await;

        if PTT.take() {
            ctx.apply_ptt(PTT_PRESSED.load(Ordering::Acquire));
        }

        match pipeline.process(&ctx) {
            PassOutcome::Skipped => {
                skipped += 1;
                if skipped % 100 == 0 {
                    warn!("{} passes skipped", skipped);
                }
            }
            PassOutcome::Received | PassOutcome::Transmitted | PassOutcome::Idle => {}
        }
    }
}
