//! Waveshare 2.13" e-paper panel with two day buttons.
//!
//! The panel is 122×250 in portrait; the frame is rotated so the chart's
//! 250×122 landscape image maps onto it directly. Buttons are wired to ground
//! and read active low.

use crate::{
    config::HardwareConfig,
    display::{ButtonEvent, Panel, PanelError},
    image::RenderedImage,
};
use embedded_graphics::prelude::*;
use embedded_hal::digital::InputPin;
use epd_waveshare::{
    epd2in13_v2::{Display2in13, Epd2in13},
    prelude::*,
};
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};
use log::{debug, info, warn};

const LANDSCAPE: (u32, u32) = (250, 122);
const CONSUMER: &str = "tide-chart";

type Driver = Epd2in13<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

fn hw<E: core::fmt::Debug>(context: &'static str) -> impl FnOnce(E) -> PanelError {
    move |e| PanelError::Hardware(format!("{context}: {e:?}"))
}

/// E-paper panel plus next/previous buttons.
pub struct EpdPanel {
    spi: SpidevDevice,
    delay: Delay,
    epd: Driver,
    next: CdevPin,
    previous: CdevPin,
}

impl EpdPanel {
    /// Open SPI and GPIO lines and initialise the controller.
    pub fn open(config: &HardwareConfig) -> Result<Self, PanelError> {
        let mut chip = Chip::new(&config.gpio_chip).map_err(hw("open gpio chip"))?;
        let output = |chip: &mut Chip, offset: u32| -> Result<CdevPin, PanelError> {
            let handle = chip
                .get_line(offset)
                .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, CONSUMER))
                .map_err(hw("request output line"))?;
            CdevPin::new(handle).map_err(hw("wrap output line"))
        };
        let input = |chip: &mut Chip, offset: u32| -> Result<CdevPin, PanelError> {
            let handle = chip
                .get_line(offset)
                .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
                .map_err(hw("request input line"))?;
            CdevPin::new(handle).map_err(hw("wrap input line"))
        };

        let dc = output(&mut chip, config.dc_pin)?;
        let rst = output(&mut chip, config.rst_pin)?;
        let busy = input(&mut chip, config.busy_pin)?;
        let next = input(&mut chip, config.next_pin)?;
        let previous = input(&mut chip, config.previous_pin)?;

        let mut spi = SpidevDevice::open(&config.spi_device).map_err(hw("open spi device"))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0.configure(&options).map_err(hw("configure spi"))?;

        let mut delay = Delay;
        let epd = Epd2in13::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(hw("initialise panel"))?;
        info!("E-paper panel initialised on {}", config.spi_device);

        Ok(EpdPanel {
            spi,
            delay,
            epd,
            next,
            previous,
        })
    }
}

impl Panel for EpdPanel {
    fn render(&mut self, image: RenderedImage) -> Result<(), PanelError> {
        let actual = (image.width(), image.height());
        if actual != LANDSCAPE {
            return Err(PanelError::SizeMismatch {
                expected: LANDSCAPE,
                actual,
            });
        }

        let mut frame = Display2in13::default();
        frame.set_rotation(DisplayRotation::Rotate90);
        let pixels = image.rows().enumerate().flat_map(|(y, row)| {
            row.into_iter().enumerate().map(move |(x, ink)| {
                let color = if ink { Color::Black } else { Color::White };
                Pixel(Point::new(x as i32, y as i32), color)
            })
        });
        frame.draw_iter(pixels).unwrap_or_else(|never| match never {});

        self.epd
            .wake_up(&mut self.spi, &mut self.delay)
            .map_err(hw("wake panel"))?;
        self.epd
            .update_and_display_frame(&mut self.spi, frame.buffer(), &mut self.delay)
            .map_err(hw("update panel"))?;
        // Image stays on the panel while the controller sleeps
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(hw("sleep panel"))?;
        debug!("Panel refreshed");
        Ok(())
    }

    fn poll_buttons(&mut self) -> ButtonEvent {
        let next = self.next.is_low();
        let previous = self.previous.is_low();
        match (next, previous) {
            (Ok(true), Ok(false)) => ButtonEvent::Next,
            (Ok(false), Ok(true)) => ButtonEvent::Previous,
            (Ok(_), Ok(_)) => ButtonEvent::None,
            (Err(e), _) | (_, Err(e)) => {
                warn!("Button read failed: {:?}", e);
                ButtonEvent::None
            }
        }
    }
}
