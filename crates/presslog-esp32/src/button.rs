//! Button GPIO and its interrupt.

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};
use esp_idf_svc::sys::EspError;
use log::info;
use presslog_core::EdgeDebouncer;

/// Milliseconds since boot, wrapping. Safe to call from an ISR.
pub fn millis() -> u32 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1000) as u32
}

/// Active-low push button with its falling-edge interrupt.
pub struct PressButton {
    driver: PinDriver<'static, AnyIOPin, Input>,
}

impl PressButton {
    /// Configure `pin` as a pulled-up input feeding `debouncer` from its ISR.
    pub fn new(pin: u8, debouncer: &'static EdgeDebouncer) -> Result<Self, EspError> {
        // SAFETY: the pin number comes from the device config and nothing else drives it.
        let gpio = unsafe { AnyIOPin::new(pin as i32) };
        let mut driver = PinDriver::input(gpio)?;
        driver.set_pull(Pull::Up)?;
        driver.set_interrupt_type(InterruptType::NegEdge)?;

        // SAFETY: the callback only touches atomics and the ISR-safe timer.
        unsafe {
            driver.subscribe(move || {
                debouncer.on_falling_edge(millis());
            })?;
        }
        driver.enable_interrupt()?;

        info!("Button on GPIO{} armed", pin);
        Ok(Self { driver })
    }

    /// Re-enable the interrupt; the driver disables it each time it fires.
    pub fn rearm(&mut self) -> Result<(), EspError> {
        self.driver.enable_interrupt()
    }
}
