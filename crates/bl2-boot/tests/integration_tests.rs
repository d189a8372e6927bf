// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for bl2-boot
//!
//! Tests for bring-up ordering and failure policy, anti-rollback, image
//! placement and TEE header parsing. Every collaborator is faked; the fakes
//! share one journal so tests can check the order of driver calls.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use bl2_boot::{Board, BootContext};
use bl2_common::log::{LogEntry, LogSink};
use bl2_common::time::Micros;
use bl2_common::{AuthStatus, BootDevice, BootInterface, ImageId, MemoryRegion};
use bl2_hal::stm32mp1::regs::uart_base;
use bl2_hal::{
    BackupContext, CacheMaintenance, ClockDriver, ClockId, ConfigSource, DebugConfig, DramDriver,
    DynConfig, FuseField, FuseStorage, HalError, HalResult, Halt, ImageMemory, IoSetup, Mmio, Mmu,
    NodeStatus, OperatingPoint, PmicDriver, ResetController, ResetId, SecurityController,
    TimeSource, UartConsole, UartNode, WatchdogDriver,
};

// ============================================================================
// Fake board
// ============================================================================

type Journal = Rc<RefCell<Vec<&'static str>>>;

fn note(journal: &Journal, call: &'static str) {
    journal.borrow_mut().push(call);
}

fn check(ok: bool, err: HalError) -> HalResult<()> {
    if ok {
        Ok(())
    } else {
        Err(err)
    }
}

/// Register file; `stuck` bits never read back as set
#[derive(Default)]
struct FakeMmio {
    values: HashMap<u32, u32>,
    writes: Vec<(u32, u32)>,
    stuck: Option<(u32, u32)>,
}

impl FakeMmio {
    fn wrote(&self, address: u32, value: u32) -> bool {
        self.writes.contains(&(address, value))
    }
}

impl Mmio for FakeMmio {
    fn read32(&self, address: u32) -> u32 {
        let value = self.values.get(&address).copied().unwrap_or(0);
        match self.stuck {
            Some((addr, mask)) if addr == address => value & !mask,
            _ => value,
        }
    }

    fn write32(&mut self, address: u32, value: u32) {
        self.values.insert(address, value);
        self.writes.push((address, value));
    }
}

/// Advances one microsecond per read so every poll terminates
#[derive(Default)]
struct FakeTimer {
    now: Cell<u64>,
}

impl TimeSource for FakeTimer {
    fn now_us(&self) -> Micros {
        let t = self.now.get() + 1;
        self.now.set(t);
        Micros::new(t)
    }

    fn delay_us(&mut self, us: u32) {
        self.now.set(self.now.get() + u64::from(us));
    }
}

struct FakeFuses {
    journal: Journal,
    probe_ok: bool,
    read_ok: bool,
    program_ok: bool,
    index: u32,
    value: u32,
    programmed: Vec<(u32, u32)>,
    burnable: u32,
    debug: DebugConfig,
    closed: bool,
}

impl FakeFuses {
    fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            probe_ok: true,
            read_ok: true,
            program_ok: true,
            index: 44,
            value: 0,
            programmed: Vec::new(),
            burnable: u32::MAX,
            debug: DebugConfig::empty(),
            closed: false,
        }
    }
}

impl FuseStorage for FakeFuses {
    fn probe(&mut self) -> HalResult<()> {
        note(&self.journal, "fuses.probe");
        check(self.probe_ok, HalError::InitFailed)
    }

    fn read_index(&self, _field: FuseField) -> HalResult<u32> {
        check(self.read_ok, HalError::ReadFailed).map(|()| self.index)
    }

    fn read_value(&self, _field: FuseField) -> HalResult<u32> {
        check(self.read_ok, HalError::ReadFailed).map(|()| self.value)
    }

    fn program(&mut self, value: u32, index: u32) -> HalResult<()> {
        note(&self.journal, "fuses.program");
        check(self.program_ok, HalError::ProgramFailed)?;
        // Fuse bits only ever go from 0 to 1
        self.value |= value & self.burnable;
        self.programmed.push((value, index));
        Ok(())
    }

    fn read_debug_config(&self) -> DebugConfig {
        self.debug
    }

    fn is_closed_device(&self) -> bool {
        self.closed
    }
}

struct FakeMmu {
    journal: Journal,
    ok: bool,
    regions: Vec<MemoryRegion>,
    dynamic: Vec<MemoryRegion>,
    enabled: bool,
}

impl Mmu for FakeMmu {
    fn add_region(&mut self, region: &MemoryRegion) -> HalResult<()> {
        self.regions.push(*region);
        Ok(())
    }

    fn add_dynamic_region(&mut self, region: &MemoryRegion) -> HalResult<()> {
        note(&self.journal, "mmu.add_dynamic");
        self.dynamic.push(*region);
        Ok(())
    }

    fn enable(&mut self) -> HalResult<()> {
        note(&self.journal, "mmu.enable");
        check(self.ok, HalError::HardwareFault)?;
        self.enabled = true;
        Ok(())
    }
}

struct FakeConfig {
    journal: Journal,
    open_ok: bool,
    dram_size: u64,
    pmic: bool,
    pll1_predefined: bool,
    opp: Option<OperatingPoint>,
    supply: Option<&'static str>,
    uart: Option<UartNode>,
    pinctrl_ok: bool,
    model: Option<&'static str>,
    populate_ok: bool,
    images: HashMap<ImageId, DynConfig>,
}

impl ConfigSource for FakeConfig {
    fn open_and_check(&mut self) -> HalResult<()> {
        note(&self.journal, "config.open");
        check(self.open_ok, HalError::InvalidParameter)
    }

    fn dram_size(&self) -> u64 {
        self.dram_size
    }

    fn pmic_present(&self) -> bool {
        self.pmic
    }

    fn pll1_predefined(&self) -> bool {
        self.pll1_predefined
    }

    fn max_opp(&self) -> HalResult<OperatingPoint> {
        self.opp.ok_or(HalError::NotPresent)
    }

    fn cpu_supply_name(&self) -> Option<&'static str> {
        self.supply
    }

    fn stdout_uart(&self) -> HalResult<UartNode> {
        self.uart.ok_or(HalError::NotPresent)
    }

    fn set_stdout_pinctrl(&mut self) -> HalResult<()> {
        check(self.pinctrl_ok, HalError::InvalidParameter)
    }

    fn board_model(&self) -> Option<&str> {
        self.model
    }

    fn populate_fw_config(&mut self, _window: &MemoryRegion) -> HalResult<()> {
        note(&self.journal, "config.populate");
        check(self.populate_ok, HalError::InvalidParameter)
    }

    fn image_config(&self, image: ImageId) -> Option<DynConfig> {
        self.images.get(&image).copied()
    }
}

struct FakeClock {
    journal: Journal,
    probe_ok: bool,
    init_ok: bool,
    init_freq: Option<u32>,
    enabled: Vec<ClockId>,
    opp: Option<OperatingPoint>,
}

impl ClockDriver for FakeClock {
    fn probe(&mut self) -> HalResult<()> {
        note(&self.journal, "clock.probe");
        check(self.probe_ok, HalError::InitFailed)
    }

    fn init(&mut self, freq_khz: u32) -> HalResult<()> {
        note(&self.journal, "clock.init");
        self.init_freq = Some(freq_khz);
        check(self.init_ok, HalError::InitFailed)
    }

    fn enable(&mut self, clock: ClockId) {
        note(&self.journal, "clock.enable");
        self.enabled.push(clock);
    }

    fn rate(&self, _clock: ClockId) -> u32 {
        64_000_000
    }

    fn max_freq_opp(&self) -> HalResult<OperatingPoint> {
        self.opp.ok_or(HalError::NotPresent)
    }
}

struct FakePmic {
    journal: Journal,
    init_ok: bool,
    configure_ok: bool,
    voltage_mv: u16,
    version: Option<u8>,
}

impl PmicDriver for FakePmic {
    fn initialize(&mut self) -> HalResult<()> {
        note(&self.journal, "pmic.initialize");
        check(self.init_ok, HalError::InitFailed)
    }

    fn configure(&mut self) -> HalResult<()> {
        note(&self.journal, "pmic.configure");
        check(self.configure_ok, HalError::InitFailed)
    }

    fn voltage_mv(&self, _rail: &str) -> HalResult<u16> {
        Ok(self.voltage_mv)
    }

    fn set_voltage_mv(&mut self, _rail: &str, voltage_mv: u16) -> HalResult<()> {
        note(&self.journal, "pmic.set_voltage");
        self.voltage_mv = voltage_mv;
        Ok(())
    }

    fn version(&self) -> HalResult<u8> {
        self.version.ok_or(HalError::ReadFailed)
    }
}

struct FakeReset {
    journal: Journal,
    ok: bool,
}

impl ResetController for FakeReset {
    fn assert(&mut self, _line: ResetId, _timeout_us: u32) -> HalResult<()> {
        note(&self.journal, "reset.assert");
        check(self.ok, HalError::Timeout)
    }

    fn deassert(&mut self, _line: ResetId, _timeout_us: u32) -> HalResult<()> {
        note(&self.journal, "reset.deassert");
        check(self.ok, HalError::Timeout)
    }
}

struct FakeUart {
    journal: Journal,
    register_ok: bool,
    registered: Option<(u32, u32, u32)>,
    stopped: Vec<u32>,
    lines: Vec<String>,
}

impl FakeUart {
    fn printed(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl LogSink for FakeUart {
    fn emit(&mut self, entry: &LogEntry) {
        self.lines.push(entry.to_string());
    }
}

impl UartConsole for FakeUart {
    fn instance_base(&self, instance: u16) -> Option<u32> {
        uart_base(instance)
    }

    fn stop(&mut self, base: u32) {
        note(&self.journal, "uart.stop");
        self.stopped.push(base);
    }

    fn register(&mut self, base: u32, clock_rate: u32, baudrate: u32) -> HalResult<()> {
        note(&self.journal, "uart.register");
        check(self.register_ok, HalError::InitFailed)?;
        self.registered = Some((base, clock_rate, baudrate));
        Ok(())
    }
}

struct FakeWatchdog {
    journal: Journal,
    init_ok: bool,
    freeze_ok: bool,
    refreshes: u32,
}

impl WatchdogDriver for FakeWatchdog {
    fn init(&mut self) -> HalResult<()> {
        note(&self.journal, "watchdog.init");
        check(self.init_ok, HalError::InitFailed)
    }

    fn refresh(&mut self) {
        note(&self.journal, "watchdog.refresh");
        self.refreshes += 1;
    }

    fn freeze_secondary(&mut self) -> HalResult<()> {
        note(&self.journal, "watchdog.freeze");
        check(self.freeze_ok, HalError::NotSupported)
    }
}

struct FakeBackup {
    journal: Journal,
    standby: bool,
    restore_ok: bool,
    save_ok: bool,
    saved: Option<(BootInterface, u16)>,
    tee_entry: u64,
    params_ok: bool,
    params_saved: u32,
    cleaned: bool,
}

impl BackupContext for FakeBackup {
    fn wakeup_from_standby(&self) -> bool {
        self.standby
    }

    fn restore_pll_settings(&mut self) -> HalResult<()> {
        note(&self.journal, "backup.restore_pll");
        check(self.restore_ok, HalError::ReadFailed)
    }

    fn save_boot_interface(&mut self, interface: BootInterface, instance: u16) -> HalResult<()> {
        check(self.save_ok, HalError::Busy)?;
        self.saved = Some((interface, instance));
        Ok(())
    }

    fn tee_entry_point(&self) -> u64 {
        self.tee_entry
    }

    fn save_stage_params(&mut self) -> HalResult<()> {
        note(&self.journal, "backup.save_params");
        check(self.params_ok, HalError::Busy)?;
        self.params_saved += 1;
        Ok(())
    }

    fn clean(&mut self) {
        note(&self.journal, "backup.clean");
        self.cleaned = true;
    }
}

struct FakeSecurity {
    journal: Journal,
    arch_ok: bool,
    exit_ok: bool,
}

impl SecurityController for FakeSecurity {
    fn arch_security_setup(&mut self) -> HalResult<()> {
        note(&self.journal, "security.arch");
        check(self.arch_ok, HalError::HardwareFault)
    }

    fn security_setup(&mut self) -> HalResult<()> {
        note(&self.journal, "security.exit");
        check(self.exit_ok, HalError::HardwareFault)
    }
}

struct FakeDram {
    journal: Journal,
    probe_ok: bool,
    restored: bool,
}

impl DramDriver for FakeDram {
    fn probe(&mut self) -> HalResult<()> {
        note(&self.journal, "dram.probe");
        check(self.probe_ok, HalError::InitFailed)
    }

    fn is_restored(&self) -> bool {
        self.restored
    }
}

struct FakeIo {
    journal: Journal,
    device: Option<BootDevice>,
}

impl IoSetup for FakeIo {
    fn setup(&mut self, device: BootDevice) -> HalResult<()> {
        note(&self.journal, "io.setup");
        self.device = Some(device);
        Ok(())
    }
}

struct FakeCache {
    flushes: Vec<(u64, u64)>,
}

impl CacheMaintenance for FakeCache {
    fn flush_dcache_range(&mut self, base: u64, size: u64) {
        self.flushes.push((base, size));
    }
}

#[derive(Default)]
struct FakeImages {
    blobs: HashMap<u64, Vec<u8>>,
}

impl ImageMemory for FakeImages {
    fn bytes(&self, address: u64, len: usize) -> Option<&[u8]> {
        self.blobs.get(&address).map(|b| &b[..len.min(b.len())])
    }
}

struct PanicHalt;

impl Halt for PanicHalt {
    fn halt(&mut self, code: u16) -> ! {
        panic!("halt 0x{code:04X}");
    }
}

const DRAM_SIZE: u64 = 0x2000_0000;
const TEE_BASE: u64 = 0x2FFC_0000;
const TEE_MAX: u64 = 0x1_9000;
const NS_BASE: u64 = 0xC010_0000;
const NS_MAX: u64 = 0x10_0000;
const HW_CONFIG_BASE: u64 = 0xC400_0000;
const TEE_CONFIG_BASE: u64 = 0x2FFF_8000;
const TEE_CONFIG_MAX: u64 = 0x4000;
/// DDR base + 512 MiB - 30 MiB secure - 2 MiB shared
const PAGED_BASE: u64 = 0xDE00_0000;
const PAGED_SIZE: u64 = 0x01E0_0000;
const CONSOLE_BASE: u32 = 0x4001_0000;

struct Rig {
    journal: Journal,
    mmio: FakeMmio,
    timer: FakeTimer,
    fuses: FakeFuses,
    mmu: FakeMmu,
    config: FakeConfig,
    clock: FakeClock,
    pmic: FakePmic,
    reset: FakeReset,
    uart: FakeUart,
    watchdog: FakeWatchdog,
    backup: FakeBackup,
    security: FakeSecurity,
    dram: FakeDram,
    io: FakeIo,
    cache: FakeCache,
    images: FakeImages,
}

impl Rig {
    /// Healthy board: PMIC present, 512 MiB DRAM, console on UART4
    fn new() -> Self {
        let journal: Journal = Rc::default();
        let j = &journal;

        let mut images = HashMap::new();
        images.insert(ImageId::Tee, DynConfig { address: TEE_BASE, max_size: TEE_MAX });
        images.insert(ImageId::NonSecureFw, DynConfig { address: NS_BASE, max_size: NS_MAX });
        images.insert(
            ImageId::HwConfig,
            DynConfig { address: HW_CONFIG_BASE, max_size: 0x2_0000 },
        );
        images.insert(
            ImageId::TeeConfig,
            DynConfig { address: TEE_CONFIG_BASE, max_size: TEE_CONFIG_MAX },
        );

        Self {
            mmio: FakeMmio::default(),
            timer: FakeTimer::default(),
            fuses: FakeFuses::new(j),
            mmu: FakeMmu {
                journal: j.clone(),
                ok: true,
                regions: Vec::new(),
                dynamic: Vec::new(),
                enabled: false,
            },
            config: FakeConfig {
                journal: j.clone(),
                open_ok: true,
                dram_size: DRAM_SIZE,
                pmic: true,
                pll1_predefined: false,
                opp: Some(OperatingPoint { freq_khz: 650_000, voltage_mv: 1350 }),
                supply: Some("vddcore"),
                uart: Some(UartNode {
                    base: CONSOLE_BASE,
                    clock: Some(ClockId(12)),
                    reset: Some(ResetId(13)),
                    status: NodeStatus::Secure,
                }),
                pinctrl_ok: true,
                model: Some("STM32MP157C-EV1"),
                populate_ok: true,
                images,
            },
            clock: FakeClock {
                journal: j.clone(),
                probe_ok: true,
                init_ok: true,
                init_freq: None,
                enabled: Vec::new(),
                opp: Some(OperatingPoint { freq_khz: 800_000, voltage_mv: 1350 }),
            },
            pmic: FakePmic {
                journal: j.clone(),
                init_ok: true,
                configure_ok: true,
                voltage_mv: 1200,
                version: Some(0x10),
            },
            reset: FakeReset { journal: j.clone(), ok: true },
            uart: FakeUart {
                journal: j.clone(),
                register_ok: true,
                registered: None,
                stopped: Vec::new(),
                lines: Vec::new(),
            },
            watchdog: FakeWatchdog {
                journal: j.clone(),
                init_ok: true,
                freeze_ok: true,
                refreshes: 0,
            },
            backup: FakeBackup {
                journal: j.clone(),
                standby: false,
                restore_ok: true,
                save_ok: true,
                saved: None,
                tee_entry: 0,
                params_ok: true,
                params_saved: 0,
                cleaned: false,
            },
            security: FakeSecurity { journal: j.clone(), arch_ok: true, exit_ok: true },
            dram: FakeDram { journal: j.clone(), probe_ok: true, restored: false },
            io: FakeIo { journal: j.clone(), device: None },
            cache: FakeCache { flushes: Vec::new() },
            images: FakeImages::default(),
            journal,
        }
    }

    fn board(&mut self) -> Board<'_> {
        Board {
            mmio: &mut self.mmio,
            timer: &mut self.timer,
            fuses: &mut self.fuses,
            mmu: &mut self.mmu,
            config: &mut self.config,
            clock: &mut self.clock,
            pmic: &mut self.pmic,
            reset: &mut self.reset,
            uart: &mut self.uart,
            watchdog: &mut self.watchdog,
            backup: &mut self.backup,
            security: &mut self.security,
            dram: &mut self.dram,
            io: &mut self.io,
            cache: &mut self.cache,
            images: &self.images,
        }
    }

    fn called(&self, call: &str) -> bool {
        self.journal.borrow().iter().any(|c| *c == call)
    }

    fn position(&self, call: &str) -> usize {
        self.journal
            .borrow()
            .iter()
            .position(|c| *c == call)
            .unwrap_or_else(|| panic!("{call} never called"))
    }
}

fn sd_boot() -> BootContext {
    BootContext {
        interface: BootInterface::Sd,
        instance: 1,
        auth_status: AuthStatus::Succeeded,
    }
}

/// OP-TEE v2 header with `(load address, segment id, size)` segments
fn tee_header(arch: u8, segments: &[(u64, u32, u32)]) -> Vec<u8> {
    use bl2_boot::tee_header::{TEE_HEADER_MAX_LEN, TEE_HEADER_VERSION, TEE_MAGIC};

    let mut bytes = vec![0u8; TEE_HEADER_MAX_LEN];
    bytes[0..4].copy_from_slice(&TEE_MAGIC.to_le_bytes());
    bytes[4] = TEE_HEADER_VERSION;
    bytes[5] = arch;
    bytes[8..12].copy_from_slice(&(segments.len() as u32).to_le_bytes());
    for (i, &(load, id, size)) in segments.iter().enumerate() {
        let at = 12 + i * 16;
        bytes[at..at + 4].copy_from_slice(&((load >> 32) as u32).to_le_bytes());
        bytes[at + 4..at + 8].copy_from_slice(&(load as u32).to_le_bytes());
        bytes[at + 8..at + 12].copy_from_slice(&id.to_le_bytes());
        bytes[at + 12..at + 16].copy_from_slice(&size.to_le_bytes());
    }
    bytes
}

// ============================================================================
// Sequencer
// ============================================================================

mod sequencer_tests {
    use super::*;
    use bl2_boot::{FatalError, ResetReason, Sequencer, Step};
    use bl2_common::{Bl2Config, Error, TeeLayout};
    use bl2_hal::stm32mp1::regs::{
        tamp_bkpr, CORE1_BRANCH_ADDRESS_BKP_IDX, CORE1_MAGIC_NUMBER_BKP_IDX, PWR_CR1,
        PWR_CR1_DBP, RCC_BDCR, RCC_BDCR_VSWRST, RCC_MP_RSTSCLRR, RCC_MP_RSTSCLRR_PORRSTF,
        RCC_MP_SREQCLRR, RCC_PWRLPDLYCR, TAMP_SMCR,
    };

    fn run(rig: &mut Rig, config: Bl2Config, ctx: BootContext) -> (Sequencer, Result<(), FatalError>) {
        let mut seq = Sequencer::new(config, ctx);
        let result = seq.run(&mut rig.board());
        (seq, result)
    }

    #[test]
    fn test_nominal_bring_up_completes_every_step() {
        let mut rig = Rig::new();
        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(result, Ok(()));
        assert_eq!(seq.ledger().completed(), &Step::ALL[..Step::ALL.len() - 1]);
        assert!(seq.report().degraded.is_empty());
        assert!(rig.mmu.enabled);
        assert_eq!(rig.mmu.regions.len(), 3);
        assert_eq!(rig.mmu.dynamic, vec![seq.config().layout.dram(DRAM_SIZE)]);
        assert_eq!(rig.uart.registered, Some((CONSOLE_BASE, 64_000_000, 115_200)));
        assert_eq!(rig.backup.saved, Some((BootInterface::Sd, 1)));
        assert_eq!(rig.io.device, Some(BootDevice::Board));
        assert_eq!(rig.watchdog.refreshes, 1);
    }

    #[test]
    fn test_clock_probed_before_voltage_is_applied() {
        let mut rig = Rig::new();
        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(rig.position("fuses.probe") < rig.position("mmu.enable"));
        assert!(rig.position("mmu.enable") < rig.position("config.open"));
        assert!(rig.position("clock.probe") < rig.position("pmic.set_voltage"));
        assert!(rig.position("pmic.set_voltage") < rig.position("clock.init"));
        assert!(rig.position("clock.init") < rig.position("uart.register"));
        assert!(rig.position("watchdog.init") < rig.position("security.arch"));
        assert!(rig.position("security.arch") < rig.position("io.setup"));
        assert!(rig.position("io.setup") < rig.position("dram.probe"));
        assert!(rig.position("dram.probe") < rig.position("mmu.add_dynamic"));
        assert_eq!(rig.pmic.voltage_mv, 1350);
        assert_eq!(rig.clock.init_freq, Some(650_000));
    }

    #[test]
    fn test_platform_setup_before_arch_setup_is_violation() {
        let mut rig = Rig::new();
        let mut seq = Sequencer::new(Bl2Config::DEFAULT, sd_boot());

        let result = seq.platform_setup(&mut rig.board());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::DramProbe,
                error: Error::StepOrderViolation,
            })
        );
        assert!(!rig.called("dram.probe"));
    }

    #[test]
    fn test_arch_setup_cannot_run_twice() {
        let mut rig = Rig::new();
        let mut seq = Sequencer::new(Bl2Config::DEFAULT, sd_boot());

        assert!(seq.arch_setup(&mut rig.board()).is_ok());
        let again = seq.arch_setup(&mut rig.board());

        assert_eq!(again.unwrap_err().error, Error::StepOrderViolation);
    }

    #[test]
    fn test_first_fatal_step_stops_sequence() {
        let mut rig = Rig::new();
        rig.clock.probe_ok = false;

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::ClockTree,
                error: Error::ClockInitFailed,
            })
        );
        assert!(seq.ledger().is_complete(Step::PowerDomain));
        assert!(!seq.ledger().is_complete(Step::ClockTree));
        assert!(!rig.called("pmic.initialize"));
        assert!(!rig.called("watchdog.init"));
    }

    #[test]
    #[should_panic(expected = "halt 0x0101")]
    fn test_fuse_probe_failure_halts_with_code() {
        let mut rig = Rig::new();
        rig.fuses.probe_ok = false;
        let mut seq = Sequencer::new(Bl2Config::DEFAULT, sd_boot());

        seq.run_or_halt(&mut rig.board(), &mut PanicHalt);
    }

    #[test]
    fn test_mmu_failure_is_fatal() {
        let mut rig = Rig::new();
        rig.mmu.ok = false;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(result.unwrap_err().error, Error::MmuConfigFailed);
        assert!(!rig.called("config.open"));
    }

    #[test]
    fn test_power_domain_register_sequence() {
        let mut rig = Rig::new();
        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(rig.mmio.wrote(RCC_MP_SREQCLRR, 0b11));
        assert!(rig.mmio.wrote(RCC_BDCR, RCC_BDCR_VSWRST));
        assert!(rig.mmio.wrote(RCC_BDCR, 0));
        assert!(rig.mmio.wrote(RCC_PWRLPDLYCR, 5));
        assert!(rig.mmio.wrote(TAMP_SMCR, (10 << 16) | 10));
    }

    #[test]
    fn test_backup_domain_reset_skipped_with_rtc_clock() {
        let mut rig = Rig::new();
        rig.mmio.values.insert(RCC_BDCR, 1 << 16);

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(!rig
            .mmio
            .writes
            .iter()
            .any(|&(a, v)| a == RCC_BDCR && v & RCC_BDCR_VSWRST != 0));
    }

    #[test]
    fn test_backup_write_access_timeout_is_fatal() {
        let mut rig = Rig::new();
        rig.mmio.stuck = Some((PWR_CR1, PWR_CR1_DBP));

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::PowerDomain,
                error: Error::Timeout,
            })
        );
        assert!(!rig.called("clock.probe"));
    }

    #[test]
    fn test_disabled_console_is_degraded() {
        let mut rig = Rig::new();
        if let Some(node) = rig.config.uart.as_mut() {
            node.status = NodeStatus::Disabled;
        }

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(seq.report().has_degraded(Error::ConsoleUnavailable));
        assert!(seq.state().console().is_none());
        assert!(!rig.called("uart.register"));
        assert!(rig.uart.lines.is_empty());
    }

    #[test]
    fn test_console_without_reset_line_is_degraded() {
        let mut rig = Rig::new();
        if let Some(node) = rig.config.uart.as_mut() {
            node.reset = None;
        }

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(seq.report().has_degraded(Error::ConsoleUnavailable));
        assert!(!rig.called("reset.assert"));
    }

    #[test]
    fn test_console_skipped_on_programmer_uart() {
        let mut rig = Rig::new();
        let ctx = BootContext {
            interface: BootInterface::SerialUart,
            instance: 4,
            auth_status: AuthStatus::NotDone,
        };

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, ctx);

        assert!(result.is_ok());
        assert_eq!(rig.uart.stopped, vec![CONSOLE_BASE]);
        assert!(rig.position("uart.stop") < rig.position("clock.probe"));
        assert!(seq.report().has_degraded(Error::ConsoleUnavailable));
        assert_eq!(rig.uart.registered, None);
    }

    #[test]
    fn test_console_reset_timeout_is_fatal() {
        let mut rig = Rig::new();
        rig.reset.ok = false;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::Console,
                error: Error::ResetLineTimeout,
            })
        );
    }

    #[test]
    fn test_console_prints_model_and_rom_authentication() {
        let mut rig = Rig::new();
        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(rig.uart.printed("Model: STM32MP157C-EV1"));
        assert!(rig.uart.printed("Bootrom authentication succeeded"));
        assert!(rig.uart.printed("PMIC version = 0x10"));
    }

    #[test]
    fn test_closed_device_requires_trusted_board_boot() {
        let mut rig = Rig::new();
        rig.fuses.closed = true;
        let config = Bl2Config::DEFAULT.with_trusted_board_boot(false);

        let (_, result) = run(&mut rig, config, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::Console,
                error: Error::AuthenticationRequired,
            })
        );
        assert!(rig.uart.registered.is_some());
        assert!(!rig.called("watchdog.init"));
    }

    #[test]
    fn test_open_debug_port_on_closed_device() {
        let mut rig = Rig::new();
        rig.fuses.closed = true;
        rig.fuses.debug = DebugConfig::DBGSWGEN | DebugConfig::SPIDEN;
        rig.watchdog.freeze_ok = false;

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(seq.report().has_degraded(Error::DebugFreezeFailed));
        assert!(seq.report().debug_port.unwrap().is_security_warning());
        assert!(seq.state().log.contains("DEBUG ACCESS PORT IS OPEN!"));
        assert!(rig.position("watchdog.freeze") < rig.position("security.arch"));
    }

    #[test]
    fn test_closed_debug_port_skips_freeze() {
        let mut rig = Rig::new();
        let (seq, _) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(!rig.called("watchdog.freeze"));
        assert!(!seq.report().debug_port.unwrap().open);
    }

    #[test]
    fn test_boot_interface_save_failure_is_degraded() {
        let mut rig = Rig::new();
        rig.backup.save_ok = false;

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(seq
            .report()
            .degraded
            .contains(&(Step::BootInterfacePersist, Error::ContextSaveFailed)));
    }

    #[test]
    fn test_security_partition_failure_is_fatal() {
        let mut rig = Rig::new();
        rig.security.arch_ok = false;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(result.unwrap_err().step, Step::SecurityPartition);
        assert!(!rig.called("io.setup"));
    }

    #[test]
    fn test_usb_programmer_selects_usb_device() {
        let mut rig = Rig::new();
        let ctx = BootContext {
            interface: BootInterface::SerialUsb,
            instance: 0,
            auth_status: AuthStatus::NotDone,
        };

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, ctx);

        assert!(result.is_ok());
        assert_eq!(seq.state().boot_device(), BootDevice::Usb);
        assert_eq!(rig.io.device, Some(BootDevice::Usb));
    }

    #[test]
    fn test_standby_exit_uses_clock_driver_opp() {
        let mut rig = Rig::new();
        rig.backup.standby = true;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(rig.position("backup.restore_pll") < rig.position("clock.init"));
        assert_eq!(rig.clock.init_freq, Some(800_000));
    }

    #[test]
    fn test_pll_restore_failure_is_fatal() {
        let mut rig = Rig::new();
        rig.backup.standby = true;
        rig.backup.restore_ok = false;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::OperatingPoint,
                error: Error::OperatingPointUnavailable,
            })
        );
    }

    #[test]
    fn test_voltage_left_alone_when_already_at_target() {
        let mut rig = Rig::new();
        rig.pmic.voltage_mv = 1350;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(!rig.called("pmic.set_voltage"));
    }

    #[test]
    fn test_predefined_pll_skips_opp_selection() {
        let mut rig = Rig::new();
        rig.config.pll1_predefined = true;
        rig.config.opp = None;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert_eq!(rig.clock.init_freq, Some(0));
        assert!(!rig.called("pmic.set_voltage"));
    }

    #[test]
    fn test_missing_supply_rail_is_fatal() {
        let mut rig = Rig::new();
        rig.config.supply = None;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(result.unwrap_err().error, Error::PmicError);
    }

    #[test]
    fn test_pmic_status_failure_is_degraded() {
        let mut rig = Rig::new();
        rig.pmic.version = None;

        let (seq, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(seq.report().has_degraded(Error::PmicStatusUnavailable));
        assert!(seq.ledger().is_complete(Step::PmicRefresh));
    }

    #[test]
    fn test_reset_reason_recorded() {
        let mut rig = Rig::new();
        rig.mmio
            .values
            .insert(RCC_MP_RSTSCLRR, RCC_MP_RSTSCLRR_PORRSTF);

        let (seq, _) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(seq.report().reset_reason, Some(ResetReason::PowerOn));
        assert!(rig.uart.printed("Power-on Reset (rst_por)"));
    }

    #[test]
    fn test_cold_dram_clears_resume_state() {
        let mut rig = Rig::new();
        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert!(result.is_ok());
        assert!(rig.mmio.wrote(tamp_bkpr(CORE1_BRANCH_ADDRESS_BKP_IDX), 0));
        assert!(rig.mmio.wrote(tamp_bkpr(CORE1_MAGIC_NUMBER_BKP_IDX), 0));
        assert!(rig.backup.cleaned);
        assert!(rig.called("pmic.configure"));
    }

    #[test]
    fn test_restored_dram_keeps_resume_state() {
        let mut rig = Rig::new();
        rig.dram.restored = true;
        let config = Bl2Config::DEFAULT.with_tee_layout(TeeLayout::DramTop);

        let (_, result) = run(&mut rig, config, sd_boot());

        assert!(result.is_ok());
        assert!(!rig.backup.cleaned);
        assert!(!rig.called("pmic.configure"));
        assert!(!rig.called("io.setup"));
    }

    #[test]
    fn test_zero_dram_size_is_fatal() {
        let mut rig = Rig::new();
        rig.config.dram_size = 0;

        let (_, result) = run(&mut rig, Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            result,
            Err(FatalError {
                step: Step::DramMapping,
                error: Error::DramMappingFailed,
            })
        );
    }

    #[test]
    fn test_prepare_exit_after_bring_up() {
        let mut rig = Rig::new();
        let mut seq = Sequencer::new(Bl2Config::DEFAULT, sd_boot());

        assert_eq!(
            seq.prepare_exit(&mut rig.board()).unwrap_err().error,
            Error::StepOrderViolation
        );
        assert!(seq.run(&mut rig.board()).is_ok());
        assert!(seq.prepare_exit(&mut rig.board()).is_ok());
        assert!(rig.called("security.exit"));
    }
}

// ============================================================================
// Anti-rollback
// ============================================================================

mod rollback_tests {
    use super::*;
    use bl2_boot::{update_monotonic_counter, CounterUpdate, Sequencer, Step};
    use bl2_common::log::LogBuffer;
    use bl2_common::{Bl2Config, Error, MonotonicVersion};

    fn unary(count: u32) -> u32 {
        if count >= 32 {
            u32::MAX
        } else {
            (1 << count) - 1
        }
    }

    #[test]
    fn test_reprogrammed_iff_counter_behind_version() {
        let journal: Journal = Rc::default();
        let words = (0..=8)
            .map(unary)
            .chain([0b1000, 0b0110, 0x8000_0000, 0b1010_0000, 0xF000_0000]);
        for stored in words {
            let count = stored.count_ones();
            for version in 0..=8 {
                let mut fuses = FakeFuses::new(&journal);
                fuses.value = stored;
                let mut log = LogBuffer::new();

                let result =
                    update_monotonic_counter(&mut fuses, MonotonicVersion::new(version), &mut log);

                if count > version {
                    assert_eq!(result, Err(Error::RollbackAttempted));
                    assert!(fuses.programmed.is_empty());
                } else if count < version {
                    let Ok(CounterUpdate::Advanced { from, to }) = result else {
                        panic!("0x{stored:x} v{version}: {result:?}");
                    };
                    assert_eq!(from, stored);
                    assert_eq!(to.count_ones(), version);
                    assert_eq!(to & stored, stored);
                    if stored == unary(count) {
                        assert_eq!(to, unary(version));
                    }
                    assert_eq!(fuses.programmed, vec![(to, fuses.index)]);
                    assert_eq!(fuses.value, to);
                } else {
                    assert_eq!(result, Ok(CounterUpdate::UpToDate { stored }));
                    assert!(fuses.programmed.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_high_stray_bit_does_not_count_as_newer_version() {
        let journal: Journal = Rc::default();
        let mut fuses = FakeFuses::new(&journal);
        fuses.value = 0b1000;
        let mut log = LogBuffer::new();

        let result = update_monotonic_counter(&mut fuses, MonotonicVersion::new(3), &mut log);

        assert_eq!(result, Ok(CounterUpdate::Advanced { from: 0b1000, to: 0b1011 }));
        assert_eq!(fuses.value.count_ones(), 3);

        // Next boot with the same firmware leaves the word alone
        let again = update_monotonic_counter(&mut fuses, MonotonicVersion::new(3), &mut log);
        assert_eq!(again, Ok(CounterUpdate::UpToDate { stored: 0b1011 }));
    }

    #[test]
    fn test_short_programmed_word_is_fatal() {
        let journal: Journal = Rc::default();
        let mut fuses = FakeFuses::new(&journal);
        fuses.burnable = 0b1;
        let mut log = LogBuffer::new();

        let result = update_monotonic_counter(&mut fuses, MonotonicVersion::new(3), &mut log);

        assert_eq!(result, Err(Error::FuseProgramFailed));
        assert!(log.contains("after programming"));
    }

    #[test]
    fn test_counter_never_decreases() {
        let journal: Journal = Rc::default();
        let mut fuses = FakeFuses::new(&journal);
        let mut log = LogBuffer::new();
        let mut previous = 0;

        for version in [1, 1, 2, 5, 5, 9, 32] {
            update_monotonic_counter(&mut fuses, MonotonicVersion::new(version), &mut log)
                .unwrap();
            let count = fuses.value.count_ones();
            assert!(count >= previous);
            assert_eq!(count, version);
            previous = count;
        }
        assert!(log.contains("Monotonic counter has been incremented"));
    }

    #[test]
    fn test_sequencer_advances_counter() {
        let mut rig = Rig::new();
        rig.fuses.value = 0b1;
        let config = Bl2Config::DEFAULT.with_firmware_version(MonotonicVersion::new(3));
        let mut seq = Sequencer::new(config, sd_boot());

        assert!(seq.run(&mut rig.board()).is_ok());

        assert_eq!(rig.fuses.programmed, vec![(0b111, 44)]);
        assert_eq!(
            seq.report().counter,
            Some(CounterUpdate::Advanced { from: 0b1, to: 0b111 })
        );
    }

    #[test]
    fn test_rollback_is_fatal() {
        let mut rig = Rig::new();
        rig.fuses.value = 0b1111;
        let config = Bl2Config::DEFAULT.with_firmware_version(MonotonicVersion::new(2));
        let mut seq = Sequencer::new(config, sd_boot());

        let result = seq.run(&mut rig.board());

        let fatal = result.unwrap_err();
        assert_eq!(fatal.step, Step::AntiRollback);
        assert_eq!(fatal.error, Error::RollbackAttempted);
        assert!(!rig.called("fuses.program"));
        assert!(!rig.called("io.setup"));
    }

    #[test]
    fn test_program_failure_is_fatal() {
        let mut rig = Rig::new();
        rig.fuses.program_ok = false;
        let config = Bl2Config::DEFAULT.with_firmware_version(MonotonicVersion::new(1));
        let mut seq = Sequencer::new(config, sd_boot());

        let fatal = seq.run(&mut rig.board()).unwrap_err();

        assert_eq!(fatal.error, Error::FuseProgramFailed);
        assert!(seq.state().log.contains("MONOTONIC_OTP program Error"));
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let journal: Journal = Rc::default();
        let mut fuses = FakeFuses::new(&journal);
        fuses.read_ok = false;
        let mut log = LogBuffer::new();

        assert_eq!(
            update_monotonic_counter(&mut fuses, MonotonicVersion::new(1), &mut log),
            Err(Error::FuseReadFailed)
        );
    }
}

// ============================================================================
// Image placement
// ============================================================================

mod placement_tests {
    use super::*;
    use bl2_boot::{ExecutionArch, PlacementResolver};
    use bl2_common::log::LogBuffer;
    use bl2_common::{Bl2Config, Error, TeeLayout};

    fn resolve(rig: &mut Rig, config: Bl2Config, ids: &[ImageId]) -> (PlacementResolver, LogBuffer) {
        let mut resolver = PlacementResolver::new(config);
        let mut log = LogBuffer::new();
        for &id in ids {
            resolver
                .post_image_load(id, &mut rig.board(), &mut log)
                .unwrap();
        }
        (resolver, log)
    }

    #[test]
    fn test_fw_config_cold_boot() {
        let mut rig = Rig::new();
        let (resolver, _) = resolve(&mut rig, Bl2Config::DEFAULT, &[ImageId::FwConfig]);

        for id in [
            ImageId::Tee,
            ImageId::NonSecureFw,
            ImageId::HwConfig,
            ImageId::TeeConfig,
        ] {
            assert!(!resolver.descriptor(id).skips_loading(), "{id}");
        }

        let tee = resolver.descriptor(ImageId::Tee);
        assert_eq!(tee.region, MemoryRegion::window(TEE_BASE, TEE_MAX));
        assert_eq!(tee.entry.pc, TEE_BASE);
        assert_eq!(resolver.descriptor(ImageId::TeePager).region, tee.region);
        assert_eq!(
            resolver.descriptor(ImageId::TeePaged).region,
            MemoryRegion::window(PAGED_BASE, PAGED_SIZE)
        );
        assert_eq!(resolver.descriptor(ImageId::NonSecureFw).entry.pc, NS_BASE);
        assert_eq!(
            resolver.descriptor(ImageId::FwConfig).region,
            Bl2Config::DEFAULT.layout.fw_config
        );
        assert!(rig.called("config.populate"));
    }

    #[test]
    fn test_paged_window_independent_of_tee_entry() {
        for (base, size) in [(0x2FFC_0000, 0x1_9000), (0xC020_0000, 0x40_0000), (0x1000, 0x10)] {
            let mut rig = Rig::new();
            rig.config
                .images
                .insert(ImageId::Tee, DynConfig { address: base, max_size: size });
            let (resolver, _) = resolve(&mut rig, Bl2Config::DEFAULT, &[ImageId::FwConfig]);

            assert_eq!(
                resolver.descriptor(ImageId::TeePaged).region,
                MemoryRegion::window(PAGED_BASE, PAGED_SIZE)
            );
        }
    }

    #[test]
    fn test_fw_config_after_low_power_resume() {
        let mut rig = Rig::new();
        rig.dram.restored = true;

        let (resolver, _) = resolve(&mut rig, Bl2Config::DEFAULT, &[ImageId::FwConfig]);

        // DRAM images are already resident
        assert!(resolver.descriptor(ImageId::HwConfig).skips_loading());
        assert!(resolver.descriptor(ImageId::NonSecureFw).skips_loading());
        assert_eq!(resolver.descriptor(ImageId::NonSecureFw).entry.pc, 0);
        // SYSRAM images are lost in standby
        assert!(!resolver.descriptor(ImageId::Tee).skips_loading());
        assert!(!resolver.descriptor(ImageId::TeeConfig).skips_loading());
    }

    #[test]
    fn test_resume_reloads_image_above_dram_window() {
        let mut rig = Rig::new();
        rig.dram.restored = true;
        rig.config.images.insert(
            ImageId::HwConfig,
            DynConfig { address: 0x1_0000_0000, max_size: 0x2_0000 },
        );

        let (resolver, _) = resolve(&mut rig, Bl2Config::DEFAULT, &[ImageId::FwConfig]);

        assert!(!resolver.descriptor(ImageId::HwConfig).skips_loading());
        assert!(resolver.descriptor(ImageId::NonSecureFw).skips_loading());
    }

    #[test]
    fn test_absent_fw_config_entry_is_skipped() {
        let mut rig = Rig::new();
        rig.config.images.remove(&ImageId::HwConfig);

        let (resolver, _) = resolve(&mut rig, Bl2Config::DEFAULT, &[ImageId::FwConfig]);

        let hw = resolver.descriptor(ImageId::HwConfig);
        assert!(hw.skips_loading());
        assert_eq!(hw.region, MemoryRegion::default());
    }

    #[test]
    fn test_fw_config_populate_failure() {
        let mut rig = Rig::new();
        rig.config.populate_ok = false;
        let mut resolver = PlacementResolver::new(Bl2Config::DEFAULT);
        let mut log = LogBuffer::new();

        assert_eq!(
            resolver.post_image_load(ImageId::FwConfig, &mut rig.board(), &mut log),
            Err(Error::ConfigTreeInvalid)
        );
    }

    #[test]
    fn test_dram_too_small_for_secure_window() {
        let mut rig = Rig::new();
        rig.config.dram_size = 0x10_0000;
        let mut resolver = PlacementResolver::new(Bl2Config::DEFAULT);
        let mut log = LogBuffer::new();

        assert_eq!(
            resolver.post_image_load(ImageId::FwConfig, &mut rig.board(), &mut log),
            Err(Error::InvalidRegion)
        );
    }

    #[test]
    fn test_split_tee_fixed_windows() {
        let mut rig = Rig::new();
        rig.images.blobs.insert(
            TEE_BASE,
            tee_header(0, &[(0xFFFF_FFFF, 0, 0x1_0000), (PAGED_BASE, 1, 0x10_0000)]),
        );

        let (resolver, _) = resolve(
            &mut rig,
            Bl2Config::DEFAULT,
            &[ImageId::FwConfig, ImageId::Tee],
        );

        let tee = resolver.descriptor(ImageId::Tee);
        assert_eq!(tee.entry.pc, TEE_BASE);
        assert_eq!(tee.entry.args, [PAGED_BASE, 0, 0]);
        assert_eq!(tee.entry.arch, ExecutionArch::Aarch32);

        let pager = resolver.descriptor(ImageId::TeePager);
        assert_eq!((pager.region.base, pager.region.size), (TEE_BASE, 0x1_0000));
        assert_eq!(pager.image_size, 0x1_0000);
        assert!(!pager.skips_loading());

        let paged = resolver.descriptor(ImageId::TeePaged);
        assert_eq!((paged.region.base, paged.region.size), (PAGED_BASE, 0x10_0000));
        assert!(!paged.skips_loading());

        // Entry point in SYSRAM: nothing to save
        assert!(!rig.called("backup.save_params"));
    }

    #[test]
    fn test_oversized_segment_is_fatal() {
        let mut rig = Rig::new();
        rig.images
            .blobs
            .insert(TEE_BASE, tee_header(0, &[(0xFFFF_FFFF, 0, 0x2_0000)]));
        let mut resolver = PlacementResolver::new(Bl2Config::DEFAULT);
        let mut log = LogBuffer::new();

        resolver
            .post_image_load(ImageId::FwConfig, &mut rig.board(), &mut log)
            .unwrap();
        let result = resolver.post_image_load(ImageId::Tee, &mut rig.board(), &mut log);

        assert_eq!(result, Err(Error::TeeHeaderInvalid));
        assert!(log.contains("OPTEE header parse error"));
    }

    #[test]
    fn test_monolithic_tee_grows_by_config_blob() {
        let mut rig = Rig::new();
        rig.images.blobs.insert(TEE_BASE, vec![0u8; 64]);

        let (resolver, _) = resolve(
            &mut rig,
            Bl2Config::DEFAULT,
            &[ImageId::FwConfig, ImageId::Tee],
        );

        let tee = resolver.descriptor(ImageId::Tee);
        assert_eq!(tee.entry.pc, TEE_BASE);
        assert_eq!(tee.region.size, TEE_MAX + TEE_CONFIG_MAX);
        assert_eq!(tee.entry.args[0], 0);
    }

    #[test]
    fn test_monolithic_tee_in_dram_saves_parameters() {
        let mut rig = Rig::new();
        rig.config
            .images
            .insert(ImageId::Tee, DynConfig { address: PAGED_BASE, max_size: 0x10_0000 });
        rig.backup.params_ok = false;

        let (resolver, _) = resolve(
            &mut rig,
            Bl2Config::DEFAULT,
            &[ImageId::FwConfig, ImageId::Tee],
        );

        assert!(rig.called("backup.save_params"));
        assert_eq!(
            resolver.degraded(),
            &[(ImageId::Tee, Error::ContextSaveFailed)]
        );
    }

    #[test]
    fn test_tee_resume_recovers_saved_entry() {
        let mut rig = Rig::new();
        rig.dram.restored = true;
        rig.backup.tee_entry = 0x5400_0100;
        rig.images
            .blobs
            .insert(TEE_BASE, tee_header(0, &[(0xFFFF_FFFF, 0, 0x1_0000)]));

        let (resolver, _) = resolve(
            &mut rig,
            Bl2Config::DEFAULT,
            &[ImageId::FwConfig, ImageId::Tee],
        );

        assert_eq!(resolver.descriptor(ImageId::Tee).entry.pc, 0x5400_0100);
        assert_eq!(rig.clock.enabled, vec![ClockId::BACKUP_SRAM]);
        assert_eq!(
            resolver.descriptor(ImageId::TeePager).region,
            MemoryRegion::window(TEE_BASE, TEE_MAX)
        );
        assert!(!rig.called("backup.save_params"));
    }

    #[test]
    fn test_split_tee_dram_top_layout() {
        let mut rig = Rig::new();
        rig.images.blobs.insert(
            TEE_BASE,
            tee_header(
                1,
                &[(PAGED_BASE, 0, 0x10_0000), (PAGED_BASE + 0x10_0000, 1, 0x10_0000)],
            ),
        );
        let config = Bl2Config::DEFAULT.with_tee_layout(TeeLayout::DramTop);

        let (resolver, _) = resolve(&mut rig, config, &[ImageId::FwConfig, ImageId::Tee]);

        let tee = resolver.descriptor(ImageId::Tee);
        assert_eq!(tee.entry.pc, PAGED_BASE);
        assert_eq!(tee.entry.arch, ExecutionArch::Aarch64);
        assert_eq!(tee.entry.args[0], PAGED_BASE + 0x10_0000);
        assert!(rig.called("backup.save_params"));
    }

    #[test]
    fn test_monolithic_tee_dram_top_enters_pager_window() {
        let mut rig = Rig::new();
        let config = Bl2Config::DEFAULT.with_tee_layout(TeeLayout::DramTop);

        let (resolver, _) = resolve(&mut rig, config, &[ImageId::FwConfig, ImageId::Tee]);

        assert_eq!(
            resolver.descriptor(ImageId::Tee).entry.pc,
            config.layout.tee_pager.base
        );
    }

    #[test]
    fn test_tee_without_region_has_no_entry_point() {
        let mut rig = Rig::new();
        let mut resolver = PlacementResolver::new(Bl2Config::DEFAULT);
        let mut log = LogBuffer::new();

        assert_eq!(
            resolver.post_image_load(ImageId::Tee, &mut rig.board(), &mut log),
            Err(Error::NoTeeEntryPoint)
        );
    }

    #[test]
    fn test_non_secure_hand_off() {
        let mut rig = Rig::new();
        let (resolver, _) = resolve(
            &mut rig,
            Bl2Config::DEFAULT,
            &[ImageId::FwConfig, ImageId::NonSecureFw],
        );

        assert_eq!(resolver.descriptor(ImageId::Tee).entry.lr_svc, NS_BASE);
        assert_eq!(rig.cache.flushes, vec![(NS_BASE, NS_MAX)]);
    }

    #[test]
    fn test_raw_image_ids() {
        let mut rig = Rig::new();
        let mut resolver = PlacementResolver::new(Bl2Config::DEFAULT);
        let mut log = LogBuffer::new();

        assert_eq!(
            resolver.post_image_load_raw(0xFFFF, &mut rig.board(), &mut log),
            Err(Error::UnknownImage)
        );
        assert!(resolver
            .post_image_load_raw(ImageId::HwConfig.loader_id(), &mut rig.board(), &mut log)
            .is_ok());
    }
}

// ============================================================================
// TEE header
// ============================================================================

mod tee_header_tests {
    use super::*;
    use bl2_boot::{SplitBounds, TeeHeader};
    use bl2_common::{Error, MemoryAttributes};

    const BOUNDS: SplitBounds = SplitBounds {
        pager: MemoryRegion::window(TEE_BASE, TEE_MAX),
        paged: MemoryRegion::window(PAGED_BASE, PAGED_SIZE),
    };

    #[test]
    fn test_two_segments_place_exactly() {
        let bytes = tee_header(0, &[(TEE_BASE + 0x100, 0, 0x8000), (PAGED_BASE, 1, 0x4_0000)]);

        let TeeHeader::Split(split) = TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &[]).unwrap()
        else {
            panic!("expected a split image");
        };

        assert_eq!(split.pager.base, TEE_BASE + 0x100);
        assert_eq!(split.pager.size, 0x8000);
        assert_eq!(
            split.pager.attributes,
            MemoryAttributes::CODE | MemoryAttributes::SECURE
        );
        assert_eq!(split.paged.base, PAGED_BASE);
        assert_eq!(split.paged.size, 0x4_0000);
        assert_eq!(split.entry_point, TEE_BASE + 0x100);
    }

    #[test]
    fn test_no_signature_is_monolithic() {
        let bytes = [0u8; 44];
        assert_eq!(
            TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &[]),
            Ok(TeeHeader::Monolithic { load_address: TEE_BASE })
        );
        assert!(!TeeHeader::has_signature(&bytes));
    }

    #[test]
    fn test_segment_larger_than_window_rejected() {
        let bytes = tee_header(0, &[(0xFFFF_FFFF, 0, (TEE_MAX + 1) as u32)]);
        assert_eq!(
            TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &[]),
            Err(Error::TeeHeaderInvalid)
        );
    }

    #[test]
    fn test_segment_over_reserved_region_rejected() {
        let reserved = [MemoryRegion::window(TEE_BASE + 0x8000, 0x1000)];
        let bytes = tee_header(0, &[(0xFFFF_FFFF, 0, 0x1_0000)]);
        assert_eq!(
            TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &reserved),
            Err(Error::TeeHeaderInvalid)
        );
    }

    #[test]
    fn test_pager_only_has_empty_paged_part() {
        let bytes = tee_header(0, &[(0xFFFF_FFFF, 0, 0x1000)]);
        let parsed = TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &[]).unwrap();
        let TeeHeader::Split(split) = parsed else {
            panic!("expected a split image");
        };
        assert_eq!(split.paged.size, 0);
        assert_eq!(split.paged.base, PAGED_BASE);
    }

    #[test]
    fn test_missing_pager_rejected() {
        let bytes = tee_header(0, &[(PAGED_BASE, 1, 0x1000)]);
        assert_eq!(
            TeeHeader::parse(&bytes, TEE_BASE, &BOUNDS, &[]),
            Err(Error::TeeHeaderInvalid)
        );
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = tee_header(0, &[(TEE_BASE, 0, 0x1000), (PAGED_BASE, 1, 0x1000)]);
        assert_eq!(
            TeeHeader::parse(&bytes[..20], TEE_BASE, &BOUNDS, &[]),
            Err(Error::TeeHeaderInvalid)
        );
    }
}

// ============================================================================
// Memory map and reporting
// ============================================================================

mod memory_tests {
    use bl2_boot::MemoryMap;
    use bl2_common::{MemoryLayout, MemoryRegion};

    #[test]
    #[should_panic(expected = "cannot map")]
    fn test_overlapping_static_regions_panic() {
        let layout = MemoryLayout::STM32MP15;
        let mut map = MemoryMap::new();
        map.add_region(layout.bl2);
        map.add_region(MemoryRegion::window(layout.bl2.base + 0x10, 0x10));
    }

    #[test]
    fn test_dram_rejected_over_static_region() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::window(0xC000_0000, 0x1000));
        let layout = MemoryLayout::STM32MP15;
        assert!(map.try_add_region(layout.dram(0x1000_0000)).is_err());
    }
}

mod report_tests {
    use bl2_boot::report::{print_reset_reason, DebugPortState};
    use bl2_boot::ResetReason;
    use bl2_common::log::LogBuffer;
    use bl2_hal::stm32mp1::regs::{
        RCC_MP_RSTSCLRR_BORRSTF, RCC_MP_RSTSCLRR_IWDG1RSTF, RCC_MP_RSTSCLRR_PADRSTF,
        RCC_MP_RSTSCLRR_PORRSTF,
    };

    #[test]
    fn test_reset_reason_priority() {
        assert_eq!(ResetReason::decode(0), ResetReason::Unknown);
        assert_eq!(
            ResetReason::decode(RCC_MP_RSTSCLRR_PORRSTF | RCC_MP_RSTSCLRR_BORRSTF),
            ResetReason::PowerOn
        );
        assert_eq!(
            ResetReason::decode(RCC_MP_RSTSCLRR_IWDG1RSTF | RCC_MP_RSTSCLRR_PADRSTF),
            ResetReason::Iwdg1
        );
        assert_eq!(ResetReason::decode(1 << 20), ResetReason::Unidentified);
    }

    #[test]
    fn test_reset_reason_logged() {
        let mut log = LogBuffer::new();
        print_reset_reason(RCC_MP_RSTSCLRR_PADRSTF, &mut log);
        assert!(log.contains("Reset reason (0x4):"));
        assert!(log.contains("Pad Reset from NRST"));
    }

    #[test]
    fn test_debug_warning_only_on_closed_device() {
        let open = DebugPortState { open: true, closed_device: false };
        let closed = DebugPortState { open: true, closed_device: true };
        assert!(!open.is_security_warning());
        assert!(closed.is_security_warning());
    }
}

mod context_tests {
    use super::*;
    use bl2_boot::{RawBootContext, Sequencer};
    use bl2_common::Bl2Config;

    #[test]
    fn test_decode_rom_hand_off() {
        let raw = RawBootContext {
            boot_interface_selected: 0x6,
            boot_interface_instance: 1,
            auth_status: 0x1,
        };
        let ctx = BootContext::from_raw(&raw);
        assert_eq!(ctx.interface, BootInterface::SerialUsb);
        assert_eq!(ctx.instance, 1);
        assert_eq!(ctx.auth_status, AuthStatus::Failed);
        assert!(ctx.is_serial_usb());
    }

    #[test]
    fn test_unknown_codes_decode_leniently() {
        let raw = RawBootContext {
            boot_interface_selected: 0x42,
            boot_interface_instance: 0,
            auth_status: 0x7,
        };
        let ctx = BootContext::from_raw(&raw);
        assert_eq!(ctx.interface, BootInterface::Unknown(0x42));
        assert_eq!(ctx.auth_status, AuthStatus::NotDone);
    }

    #[test]
    fn test_failed_rom_authentication_reported() {
        let mut rig = Rig::new();
        let raw = RawBootContext {
            boot_interface_selected: 0x2,
            boot_interface_instance: 2,
            auth_status: 0x1,
        };
        let mut seq = Sequencer::from_raw_context(Bl2Config::DEFAULT, &raw);

        assert!(seq.run(&mut rig.board()).is_ok());
        assert!(rig.uart.printed("Bootrom authentication failed"));
        assert_eq!(rig.backup.saved, Some((BootInterface::Emmc, 2)));
    }
}
