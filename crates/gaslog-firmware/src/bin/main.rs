#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_time::Delay;
use embedded_hal_bus::spi::RefCellDevice;
use embedded_sdmmc::{SdCard, VolumeManager};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use mipidsi::interface::SpiInterface;
use mipidsi::options::ColorInversion;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use gaslog_core::input::DebouncedButton;
use gaslog_core::sensors::MultiGasSensor;
use gaslog_core::storage::{FixedTimeSource, SdCardStorage};
use gaslog_core::{ControlLoop, LoggerConfig};
use gaslog_firmware::board::{
    self, DISPLAY_HEIGHT, DISPLAY_WIDTH, SPI_INIT_RATE_KHZ, SPI_RATE_MHZ,
};
use gaslog_firmware::clock::EmbassyClock;

/// One history slot per chart column
const HISTORY_LEN: usize = DISPLAY_WIDTH as usize;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "the control loop and its history live in main for the lifetime of the program"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    // Backlight on
    let _backlight = Output::new(peripherals.GPIO32, Level::High, OutputConfig::default());

    // 1. Shared SPI bus, slow until the SD card has been initialised
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default().with_frequency(Rate::from_khz(SPI_INIT_RATE_KHZ)),
    )
    .unwrap()
    .with_sck(peripherals.GPIO18)
    .with_mosi(peripherals.GPIO23)
    .with_miso(peripherals.GPIO19);
    let spi_bus = RefCell::new(spi);

    // 2. SD card on its own chip select
    let sd_cs = Output::new(peripherals.GPIO4, Level::High, OutputConfig::default());
    let sd_spi = RefCellDevice::new(&spi_bus, sd_cs, Delay).unwrap();
    let sd_card = SdCard::new(sd_spi, Delay);
    match sd_card.num_bytes() {
        Ok(bytes) => info!("SD card detected: {} bytes", bytes),
        // Not fatal: the control loop keeps retrying the mount
        Err(e) => error!("SD card not detected: {:?}", e),
    }

    if let Err(e) = spi_bus
        .borrow_mut()
        .apply_config(&SpiConfig::default().with_frequency(Rate::from_mhz(SPI_RATE_MHZ)))
    {
        error!("Failed to raise SPI clock: {:?}", e);
    }

    let volume_mgr = VolumeManager::new(sd_card, FixedTimeSource);
    let storage = SdCardStorage::new(&volume_mgr);

    // 3. Display on the same bus
    let lcd_cs = Output::new(peripherals.GPIO14, Level::High, OutputConfig::default());
    let lcd_spi = RefCellDevice::new(&spi_bus, lcd_cs, Delay).unwrap();
    let dc = Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO33, Level::High, OutputConfig::default());

    let mut spi_buffer = [0u8; 512];
    let di = SpiInterface::new(lcd_spi, dc, &mut spi_buffer);

    // No PSRAM for a 150 KiB framebuffer on this board, so the control loop
    // draws straight to the driver
    let display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .invert_colors(ColorInversion::Inverted)
        .reset_pin(rst)
        .init(&mut Delay)
        .expect("Failed to initialize display");

    info!("Display initialized");

    // 4. Gas sensor on the Grove port
    let i2c = board::create_i2c_bus(peripherals.I2C0, peripherals.GPIO21, peripherals.GPIO22)
        .expect("Failed to configure I2C");
    let sensor = MultiGasSensor::new(i2c, Delay);

    // 5. Button A
    let button_pin = Input::new(peripherals.GPIO39, InputConfig::default());
    let button = DebouncedButton::active_low(button_pin, EmbassyClock);

    let mut control = ControlLoop::<_, _, _, _, _, _, HISTORY_LEN>::new(
        LoggerConfig::default(),
        sensor,
        storage,
        display,
        button,
        EmbassyClock,
        Delay,
    )
    .expect("Default configuration is valid");

    control.run().await;

    // `run` loops forever; this only satisfies the `!` return type
    loop {
        embassy_time::Timer::after_secs(1).await;
    }
}
