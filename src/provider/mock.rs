/*!
An in-process provider.

[`MockProvider`] hands out identifiers from a counter and keeps every resource in memory. It is
used by the tests and by `clc --mock`. It does not run kernels.

What it does:
- Every device answers every property of [`DEVICE_PROPERTIES`] with a default, which can be
  overridden per property with [`MockDevice`].
- Retains and releases are counted per identifier, see [`retains`](MockProvider::retains),
  [`releases`](MockProvider::releases) and [`ref_count`](MockProvider::ref_count).
- Info queries, builds, argument bindings and enqueues are recorded as [`MockCall`]s.
- Programs are "compiled" by checking that brackets balance and collecting
  `__kernel void name(..)` entry points. A failed build has the log
  `"<line>:<col>: error: <message>\n"`.
- Buffers hold bytes, transfers copy them when enqueued.
- Commands complete when enqueued. With [`set_manual_completion`](MockProvider::set_manual_completion)
  they stay queued until [`complete`](MockProvider::complete) or
  [`complete_all`](MockProvider::complete_all) is called, and blocking calls wait for that.
- [`fail_next`](MockProvider::fail_next) makes the next call of an entry point fail.
*/

use super::{ArgValue, Provider};
use crate::{device::DEVICE_PROPERTIES, query::Shape};
use bytemuck::Pod;
use clhost_core::{
    info,
    raw::{
        RawContext, RawDevice, RawEvent, RawHandle, RawKernel, RawMem, RawPlatform, RawProgram,
        RawQueue,
    },
    types::{
        BuildStatus, CommandType, DeviceType, ExecCapabilities, ExecutionStatus, FpConfig,
        ImageDesc, ImageFormat, LocalMemType, MemCacheType, MemFlags, MemObjectType,
        QueueProperties,
    },
    Status,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{
    collections::HashMap,
    ffi::c_void,
    mem::size_of,
    ptr,
};

/// A recorded provider call.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MockCall {
    PlatformIds {
        capacity: Option<usize>,
    },
    PlatformInfo {
        platform: RawPlatform,
        param: u32,
        capacity: Option<usize>,
    },
    DeviceIds {
        platform: RawPlatform,
        device_type: DeviceType,
        capacity: Option<usize>,
    },
    DeviceInfo {
        device: RawDevice,
        param: u32,
        capacity: Option<usize>,
    },
    ContextInfo {
        context: RawContext,
        param: u32,
        capacity: Option<usize>,
    },
    ProgramBuildInfo {
        program: RawProgram,
        device: RawDevice,
        param: u32,
        capacity: Option<usize>,
    },
    EventInfo {
        event: RawEvent,
        param: u32,
        capacity: Option<usize>,
    },
    BuildProgram {
        program: RawProgram,
        devices: Vec<RawDevice>,
        options: String,
    },
    SetKernelArg {
        kernel: RawKernel,
        index: u32,
        size: usize,
    },
    ReadBuffer {
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        wait_list: Vec<RawEvent>,
        event: RawEvent,
    },
    WriteBuffer {
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        wait_list: Vec<RawEvent>,
        event: RawEvent,
    },
    CopyBuffer {
        queue: RawQueue,
        src: RawMem,
        dst: RawMem,
        size: usize,
        wait_list: Vec<RawEvent>,
        event: RawEvent,
    },
    NdRangeKernel {
        queue: RawQueue,
        kernel: RawKernel,
        global: Vec<usize>,
        local: Option<Vec<usize>>,
        wait_list: Vec<RawEvent>,
        event: RawEvent,
    },
    Marker {
        queue: RawQueue,
        wait_list: Vec<RawEvent>,
        event: RawEvent,
    },
    EnqueueWaitForEvents {
        queue: RawQueue,
        events: Vec<RawEvent>,
    },
    Flush {
        queue: RawQueue,
    },
    Finish {
        queue: RawQueue,
    },
    WaitForEvents {
        events: Vec<RawEvent>,
    },
}

fn encode<T: Pod>(value: T) -> Vec<u8> {
    bytemuck::bytes_of(&value).to_vec()
}

fn encode_str(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len() + 1);
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    bytes
}

fn encode_words(words: &[usize]) -> Vec<u8> {
    bytemuck::cast_slice(words).to_vec()
}

/// A device description.
#[derive(Clone, Debug)]
pub struct MockDevice {
    name: String,
    device_type: DeviceType,
    overrides: Vec<(u32, Option<Vec<u8>>)>,
}

impl MockDevice {
    /// A device with default properties.
    pub fn new(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            device_type,
            overrides: Vec::new(),
        }
    }
    /// Overrides a scalar property.
    pub fn with_property<T: Pod>(mut self, param: u32, value: T) -> Self {
        self.overrides.push((param, Some(encode(value))));
        self
    }
    /// Overrides a boolean property.
    pub fn with_bool(self, param: u32, value: bool) -> Self {
        self.with_property(param, u32::from(value))
    }
    /// Overrides a string property.
    pub fn with_string(mut self, param: u32, value: &str) -> Self {
        self.overrides.push((param, Some(encode_str(value))));
        self
    }
    /// Overrides an array property.
    pub fn with_words(mut self, param: u32, words: &[usize]) -> Self {
        self.overrides.push((param, Some(encode_words(words))));
        self
    }
    /// Removes a property, queries of it fail with [`Status::INVALID_VALUE`].
    pub fn without_property(mut self, param: u32) -> Self {
        self.overrides.push((param, None));
        self
    }
    fn properties(&self, platform: RawPlatform) -> HashMap<u32, Vec<u8>> {
        use info::device::*;
        let mut properties: HashMap<u32, Vec<u8>> = DEVICE_PROPERTIES
            .iter()
            .map(|property| {
                let bytes = match property.shape {
                    Shape::Scalar { size } => vec![0; size],
                    Shape::Bool => encode(0u32),
                    Shape::String => encode_str(""),
                    Shape::Words => Vec::new(),
                };
                (property.id, bytes)
            })
            .collect();
        let single_fp = FpConfig::INF_NAN | FpConfig::ROUND_TO_NEAREST | FpConfig::FMA;
        let defaults = [
            (TYPE, encode(self.device_type.bits())),
            (VENDOR_ID, encode(0x1234u32)),
            (MAX_COMPUTE_UNITS, encode(4u32)),
            (MAX_WORK_ITEM_DIMENSIONS, encode(3u32)),
            (MAX_WORK_GROUP_SIZE, encode(1024usize)),
            (MAX_WORK_ITEM_SIZES, encode_words(&[1024, 1024, 64])),
            (PREFERRED_VECTOR_WIDTH_CHAR, encode(16u32)),
            (PREFERRED_VECTOR_WIDTH_SHORT, encode(8u32)),
            (PREFERRED_VECTOR_WIDTH_INT, encode(4u32)),
            (PREFERRED_VECTOR_WIDTH_LONG, encode(2u32)),
            (PREFERRED_VECTOR_WIDTH_FLOAT, encode(4u32)),
            (PREFERRED_VECTOR_WIDTH_DOUBLE, encode(2u32)),
            (MAX_CLOCK_FREQUENCY, encode(1000u32)),
            (ADDRESS_BITS, encode(64u32)),
            (MAX_READ_IMAGE_ARGS, encode(128u32)),
            (MAX_WRITE_IMAGE_ARGS, encode(8u32)),
            (MAX_MEM_ALLOC_SIZE, encode(256u64 << 20)),
            (IMAGE2D_MAX_WIDTH, encode(8192usize)),
            (IMAGE2D_MAX_HEIGHT, encode(8192usize)),
            (IMAGE3D_MAX_WIDTH, encode(2048usize)),
            (IMAGE3D_MAX_HEIGHT, encode(2048usize)),
            (IMAGE3D_MAX_DEPTH, encode(2048usize)),
            (IMAGE_SUPPORT, encode(1u32)),
            (MAX_PARAMETER_SIZE, encode(1024usize)),
            (MAX_SAMPLERS, encode(16u32)),
            (MEM_BASE_ADDR_ALIGN, encode(1024u32)),
            (MIN_DATA_TYPE_ALIGN_SIZE, encode(128u32)),
            (SINGLE_FP_CONFIG, encode(single_fp.bits())),
            (GLOBAL_MEM_CACHE_TYPE, encode(MemCacheType::ReadWrite.to_raw())),
            (GLOBAL_MEM_CACHELINE_SIZE, encode(64u32)),
            (GLOBAL_MEM_CACHE_SIZE, encode(1u64 << 20)),
            (GLOBAL_MEM_SIZE, encode(1u64 << 30)),
            (MAX_CONSTANT_BUFFER_SIZE, encode(64u64 << 10)),
            (MAX_CONSTANT_ARGS, encode(8u32)),
            (LOCAL_MEM_TYPE, encode(LocalMemType::Local.to_raw())),
            (LOCAL_MEM_SIZE, encode(32u64 << 10)),
            (PROFILING_TIMER_RESOLUTION, encode(1usize)),
            (ENDIAN_LITTLE, encode(u32::from(cfg!(target_endian = "little")))),
            (AVAILABLE, encode(1u32)),
            (COMPILER_AVAILABLE, encode(1u32)),
            (EXECUTION_CAPABILITIES, encode(ExecCapabilities::KERNEL.bits())),
            (QUEUE_PROPERTIES, encode(QueueProperties::all().bits())),
            (NAME, encode_str(&self.name)),
            (VENDOR, encode_str("clhost")),
            (DRIVER_VERSION, encode_str("0.1.0")),
            (PROFILE, encode_str("FULL_PROFILE")),
            (VERSION, encode_str("OpenCL 1.2 mock")),
            (PLATFORM, encode(platform)),
            (DOUBLE_FP_CONFIG, encode(FpConfig::empty().bits())),
            (HALF_FP_CONFIG, encode(FpConfig::empty().bits())),
        ];
        properties.extend(defaults);
        for (param, value) in self.overrides.iter() {
            match value {
                Some(bytes) => {
                    properties.insert(*param, bytes.clone());
                }
                None => {
                    properties.remove(param);
                }
            }
        }
        properties
    }
}

/// A platform description.
#[derive(Clone, Debug)]
pub struct MockPlatform {
    name: String,
    vendor: String,
    devices: Vec<MockDevice>,
}

impl MockPlatform {
    /// A platform without devices.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: "clhost".into(),
            devices: Vec::new(),
        }
    }
    /// Sets the vendor.
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }
    /// Adds a device.
    pub fn with_device(mut self, device: MockDevice) -> Self {
        self.devices.push(device);
        self
    }
}

impl Default for MockPlatform {
    /// One GPU.
    fn default() -> Self {
        Self::new("Mock Platform").with_device(MockDevice::new("Mock GPU", DeviceType::GPU))
    }
}

struct PlatformState {
    raw: RawPlatform,
    properties: HashMap<u32, Vec<u8>>,
    devices: Vec<RawDevice>,
}

struct DeviceState {
    device_type: DeviceType,
    properties: HashMap<u32, Vec<u8>>,
}

struct ContextState {
    platform: RawPlatform,
    devices: Vec<RawDevice>,
}

struct MemState {
    data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Param {
    Value,
    Mem,
    Local,
}

struct EntryPoint {
    name: String,
    params: Vec<Param>,
}

#[derive(Default)]
struct BuildState {
    status: Option<BuildStatus>,
    options: String,
    log: String,
}

struct ProgramState {
    context: RawContext,
    source: String,
    builds: HashMap<RawDevice, BuildState>,
    entry_points: Option<Vec<EntryPoint>>,
}

struct KernelState {
    params: Vec<Param>,
    args: Vec<bool>,
}

struct QueueState {
    device: RawDevice,
}

struct EventState {
    queue: RawQueue,
    command_type: CommandType,
    status: ExecutionStatus,
}

#[derive(Default)]
struct Counter {
    retains: u32,
    releases: u32,
}

#[derive(Default)]
struct State {
    next_id: usize,
    platforms: Vec<PlatformState>,
    devices: HashMap<RawDevice, DeviceState>,
    contexts: HashMap<RawContext, ContextState>,
    mems: HashMap<RawMem, MemState>,
    programs: HashMap<RawProgram, ProgramState>,
    kernels: HashMap<RawKernel, KernelState>,
    queues: HashMap<RawQueue, QueueState>,
    events: HashMap<RawEvent, EventState>,
    ref_counts: HashMap<usize, u32>,
    counters: HashMap<usize, Counter>,
    calls: Vec<MockCall>,
    failures: HashMap<&'static str, Status>,
    manual_completion: bool,
}

impl State {
    fn next<R: RawHandle>(&mut self) -> R {
        self.next_id += 1;
        R::from_addr(self.next_id * 0x10)
    }
    fn create<R: RawHandle>(&mut self) -> R {
        let raw: R = self.next();
        self.ref_counts.insert(raw.addr(), 1);
        raw
    }
    fn fail(&mut self, entry_point: &'static str) -> Result<(), Status> {
        match self.failures.remove(entry_point) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
    fn add_platform(&mut self, platform: MockPlatform) -> RawPlatform {
        use info::platform::*;
        let raw = self.next();
        let mut devices = Vec::with_capacity(platform.devices.len());
        for device in platform.devices.iter() {
            let device_raw = self.next();
            self.devices.insert(
                device_raw,
                DeviceState {
                    device_type: device.device_type,
                    properties: device.properties(raw),
                },
            );
            devices.push(device_raw);
        }
        let properties = [
            (PROFILE, encode_str("FULL_PROFILE")),
            (VERSION, encode_str("OpenCL 1.2 mock")),
            (NAME, encode_str(&platform.name)),
            (VENDOR, encode_str(&platform.vendor)),
            (EXTENSIONS, encode_str("")),
        ]
        .into_iter()
        .collect();
        self.platforms.push(PlatformState {
            raw,
            properties,
            devices,
        });
        raw
    }
    fn platform(&self, platform: RawPlatform) -> Result<&PlatformState, Status> {
        self.platforms
            .iter()
            .find(|x| x.raw == platform)
            .ok_or(Status::INVALID_PLATFORM)
    }
    fn check_wait_list(&self, wait_list: &[RawEvent]) -> Result<(), Status> {
        if wait_list.iter().all(|event| self.events.contains_key(event)) {
            Ok(())
        } else {
            Err(Status::INVALID_EVENT_WAIT_LIST)
        }
    }
    fn check_queue(&self, queue: RawQueue) -> Result<(), Status> {
        if self.queues.contains_key(&queue) {
            Ok(())
        } else {
            Err(Status::INVALID_COMMAND_QUEUE)
        }
    }
    fn mem_range(
        &mut self,
        buffer: RawMem,
        offset: usize,
        size: usize,
    ) -> Result<&mut [u8], Status> {
        let mem = self
            .mems
            .get_mut(&buffer)
            .ok_or(Status::INVALID_MEM_OBJECT)?;
        let end = offset.checked_add(size).ok_or(Status::INVALID_VALUE)?;
        if size == 0 || end > mem.data.len() {
            return Err(Status::INVALID_VALUE);
        }
        Ok(&mut mem.data[offset..end])
    }
    fn new_event(
        &mut self,
        queue: RawQueue,
        command_type: CommandType,
        wait_list: &[RawEvent],
    ) -> RawEvent {
        let ready = wait_list.iter().all(|event| {
            self.events
                .get(event)
                .map_or(true, |x| x.status == ExecutionStatus::Complete)
        });
        let status = if self.manual_completion || !ready {
            ExecutionStatus::Queued
        } else {
            ExecutionStatus::Complete
        };
        let event = self.create();
        self.events.insert(
            event,
            EventState {
                queue,
                command_type,
                status,
            },
        );
        event
    }
    fn events_complete(&self, events: &[RawEvent]) -> Result<bool, Status> {
        let mut complete = true;
        for event in events {
            let state = self.events.get(event).ok_or(Status::INVALID_EVENT)?;
            complete &= state.status == ExecutionStatus::Complete;
        }
        Ok(complete)
    }
    fn retain(&mut self, addr: usize, exists: bool, invalid: Status) -> Result<(), Status> {
        let count = self.ref_counts.get_mut(&addr).filter(|_| exists).ok_or(invalid)?;
        *count += 1;
        self.counters.entry(addr).or_default().retains += 1;
        Ok(())
    }
    /// Returns true if the count dropped to 0.
    fn release(&mut self, addr: usize, exists: bool, invalid: Status) -> Result<bool, Status> {
        let count = self.ref_counts.get_mut(&addr).filter(|_| exists).ok_or(invalid)?;
        *count -= 1;
        let destroyed = *count == 0;
        if destroyed {
            self.ref_counts.remove(&addr);
        }
        self.counters.entry(addr).or_default().releases += 1;
        Ok(destroyed)
    }
}

fn write_info(bytes: &[u8], value: Option<&mut [u8]>) -> Result<usize, Status> {
    if let Some(value) = value {
        if value.len() < bytes.len() {
            return Err(Status::INVALID_VALUE);
        }
        value[..bytes.len()].copy_from_slice(bytes);
    }
    Ok(bytes.len())
}

fn fill_ids<R: RawHandle>(ids: &[R], out: Option<&mut [R]>) -> Result<u32, Status> {
    if let Some(out) = out {
        if out.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let n = out.len().min(ids.len());
        out[..n].copy_from_slice(&ids[..n]);
    }
    u32::try_from(ids.len()).map_err(|_| Status::OUT_OF_HOST_MEMORY)
}

/// An in-process provider, see the [module](self) docs.
pub struct MockProvider {
    state: Mutex<State>,
    completed: Condvar,
}

impl Default for MockProvider {
    /// One platform with one GPU.
    fn default() -> Self {
        Self::new([MockPlatform::default()])
    }
}

impl MockProvider {
    /// Creates a provider with `platforms`.
    pub fn new(platforms: impl IntoIterator<Item = MockPlatform>) -> Self {
        let mut state = State::default();
        for platform in platforms {
            state.add_platform(platform);
        }
        Self {
            state: Mutex::new(state),
            completed: Condvar::new(),
        }
    }
    /// Adds a platform. It is visible to later enumerations.
    pub fn push_platform(&self, platform: MockPlatform) -> RawPlatform {
        self.state.lock().add_platform(platform)
    }
    /// The platforms.
    pub fn platforms(&self) -> Vec<RawPlatform> {
        self.state.lock().platforms.iter().map(|x| x.raw).collect()
    }
    /// The devices of `platform`.
    pub fn devices(&self, platform: RawPlatform) -> Vec<RawDevice> {
        self.state
            .lock()
            .platform(platform)
            .map(|x| x.devices.clone())
            .unwrap_or_default()
    }
    /// Number of times `raw` was retained.
    pub fn retains<R: RawHandle>(&self, raw: R) -> u32 {
        self.state
            .lock()
            .counters
            .get(&raw.addr())
            .map_or(0, |x| x.retains)
    }
    /// Number of times `raw` was released.
    pub fn releases<R: RawHandle>(&self, raw: R) -> u32 {
        self.state
            .lock()
            .counters
            .get(&raw.addr())
            .map_or(0, |x| x.releases)
    }
    /// The reference count of `raw`, or None if it was destroyed.
    pub fn ref_count<R: RawHandle>(&self, raw: R) -> Option<u32> {
        self.state.lock().ref_counts.get(&raw.addr()).copied()
    }
    /// Whether `raw` is alive.
    pub fn is_live<R: RawHandle>(&self, raw: R) -> bool {
        self.ref_count(raw).is_some()
    }
    /// Number of live reference counted resources.
    pub fn live_count(&self) -> usize {
        self.state.lock().ref_counts.len()
    }
    /// The recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }
    /// Clears the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
    /// The next call to `entry_point` (a [`Provider`] method name) fails with `status`.
    pub fn fail_next(&self, entry_point: &'static str, status: Status) {
        self.state.lock().failures.insert(entry_point, status);
    }
    /// The contents of a memory object.
    pub fn mem_data(&self, mem: RawMem) -> Option<Vec<u8>> {
        self.state.lock().mems.get(&mem).map(|x| x.data.clone())
    }
    /// The source of a program.
    pub fn program_source(&self, program: RawProgram) -> Option<String> {
        self.state
            .lock()
            .programs
            .get(&program)
            .map(|x| x.source.clone())
    }
    /// When enabled, commands stay queued until completed with [`complete`](Self::complete).
    pub fn set_manual_completion(&self, manual: bool) {
        self.state.lock().manual_completion = manual;
    }
    /// Completes `event`. Returns false if there is no such event.
    pub fn complete(&self, event: RawEvent) -> bool {
        let mut state = self.state.lock();
        let found = match state.events.get_mut(&event) {
            Some(event) => {
                event.status = ExecutionStatus::Complete;
                true
            }
            None => false,
        };
        self.completed.notify_all();
        found
    }
    /// Completes every event.
    pub fn complete_all(&self) {
        let mut state = self.state.lock();
        for event in state.events.values_mut() {
            event.status = ExecutionStatus::Complete;
        }
        self.completed.notify_all();
    }
    /// Events that have not completed, in no particular order.
    pub fn pending_events(&self) -> Vec<RawEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|(_, x)| x.status != ExecutionStatus::Complete)
            .map(|(raw, _)| *raw)
            .collect()
    }
    fn wait_complete(
        &self,
        state: &mut MutexGuard<State>,
        events: &[RawEvent],
    ) -> Result<(), Status> {
        while !state.events_complete(events)? {
            self.completed.wait(state);
        }
        Ok(())
    }
}

fn compile(source: &str) -> Result<Vec<EntryPoint>, String> {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    for (line, text) in source.lines().enumerate() {
        for (col, c) in text.chars().enumerate() {
            let (line, col) = (line + 1, col + 1);
            match c {
                '(' | '[' | '{' => stack.push((c, line, col)),
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((x, ..)) if x == open => {}
                        _ => return Err(format!("{line}:{col}: error: unexpected '{c}'\n")),
                    }
                }
                _ => {}
            }
        }
    }
    if let Some((c, line, col)) = stack.pop() {
        return Err(format!("{line}:{col}: error: unclosed '{c}'\n"));
    }
    Ok(entry_points(source))
}

fn tokens(code: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in code.char_indices() {
        let ident = c.is_ascii_alphanumeric() || c == '_';
        match (ident, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(&code[s..i]);
                start = None;
            }
            _ => {}
        }
        if !ident && !c.is_whitespace() {
            tokens.push(&code[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = start {
        tokens.push(&code[s..]);
    }
    tokens
}

fn entry_points(code: &str) -> Vec<EntryPoint> {
    let tokens = tokens(code);
    let mut entry_points = Vec::new();
    let mut i = 0;
    while i + 3 < tokens.len() {
        let is_entry = matches!(tokens[i], "__kernel" | "kernel")
            && tokens[i + 1] == "void"
            && tokens[i + 3] == "(";
        if !is_entry {
            i += 1;
            continue;
        }
        let name = tokens[i + 2].to_string();
        let mut params = Vec::new();
        let mut param: Vec<&str> = Vec::new();
        let mut depth = 0;
        let mut j = i + 4;
        while j < tokens.len() {
            let token = tokens[j];
            match token {
                "(" => depth += 1,
                ")" if depth == 0 => break,
                ")" => depth -= 1,
                "," if depth == 0 => {
                    params.push(classify(&param));
                    param.clear();
                    j += 1;
                    continue;
                }
                _ => {}
            }
            param.push(token);
            j += 1;
        }
        if !(param.is_empty() || param == ["void"]) {
            params.push(classify(&param));
        }
        entry_points.push(EntryPoint { name, params });
        i = j;
    }
    entry_points
}

fn classify(param: &[&str]) -> Param {
    if param.iter().any(|x| matches!(*x, "__local" | "local")) {
        Param::Local
    } else if param
        .iter()
        .any(|x| matches!(*x, "*" | "image2d_t" | "image3d_t"))
    {
        Param::Mem
    } else {
        Param::Value
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn platform_ids(&self, platforms: Option<&mut [RawPlatform]>) -> Result<u32, Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::PlatformIds {
            capacity: platforms.as_ref().map(|x| x.len()),
        });
        state.fail("platform_ids")?;
        let ids: Vec<_> = state.platforms.iter().map(|x| x.raw).collect();
        fill_ids(&ids, platforms)
    }
    fn platform_info(
        &self,
        platform: RawPlatform,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::PlatformInfo {
            platform,
            param,
            capacity: value.as_ref().map(|x| x.len()),
        });
        state.fail("platform_info")?;
        let bytes = state
            .platform(platform)?
            .properties
            .get(&param)
            .ok_or(Status::INVALID_VALUE)?;
        write_info(bytes, value)
    }
    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        devices: Option<&mut [RawDevice]>,
    ) -> Result<u32, Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::DeviceIds {
            platform,
            device_type,
            capacity: devices.as_ref().map(|x| x.len()),
        });
        state.fail("device_ids")?;
        if device_type.is_empty() {
            return Err(Status::INVALID_DEVICE_TYPE);
        }
        let all = &state.platform(platform)?.devices;
        let ids: Vec<RawDevice> = if device_type == DeviceType::DEFAULT {
            all.iter().take(1).copied().collect()
        } else {
            all.iter()
                .copied()
                .filter(|x| {
                    state
                        .devices
                        .get(x)
                        .map_or(false, |x| x.device_type.intersects(device_type))
                })
                .collect()
        };
        if ids.is_empty() {
            return Err(Status::DEVICE_NOT_FOUND);
        }
        fill_ids(&ids, devices)
    }
    fn device_info(
        &self,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::DeviceInfo {
            device,
            param,
            capacity: value.as_ref().map(|x| x.len()),
        });
        state.fail("device_info")?;
        let bytes = state
            .devices
            .get(&device)
            .ok_or(Status::INVALID_DEVICE)?
            .properties
            .get(&param)
            .ok_or(Status::INVALID_VALUE)?;
        write_info(bytes, value)
    }
    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status> {
        let mut state = self.state.lock();
        state.fail("create_context")?;
        let platform_devices = &state.platform(platform)?.devices;
        if devices.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        if !devices.iter().all(|x| platform_devices.contains(x)) {
            return Err(Status::INVALID_DEVICE);
        }
        let context = state.create();
        state.contexts.insert(
            context,
            ContextState {
                platform,
                devices: devices.to_vec(),
            },
        );
        Ok(context)
    }
    fn context_info(
        &self,
        context: RawContext,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        use info::context::*;
        let mut state = self.state.lock();
        state.calls.push(MockCall::ContextInfo {
            context,
            param,
            capacity: value.as_ref().map(|x| x.len()),
        });
        state.fail("context_info")?;
        let ctx = state.contexts.get(&context).ok_or(Status::INVALID_CONTEXT)?;
        let bytes = match param {
            REFERENCE_COUNT => encode(state.ref_counts.get(&context.addr()).copied().unwrap_or(0)),
            DEVICES => bytemuck::cast_slice::<RawDevice, u8>(&ctx.devices).to_vec(),
            NUM_DEVICES => encode(ctx.devices.len() as u32),
            PROPERTIES => encode_words(&[PLATFORM as usize, ctx.platform.addr(), 0]),
            _ => return Err(Status::INVALID_VALUE),
        };
        write_info(&bytes, value)
    }
    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let mut state = self.state.lock();
        state.fail("create_buffer")?;
        if !state.contexts.contains_key(&context) {
            return Err(Status::INVALID_CONTEXT);
        }
        if size == 0 {
            return Err(Status::INVALID_BUFFER_SIZE);
        }
        let copy = flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR);
        if copy == host_ptr.is_null() {
            return Err(Status::INVALID_HOST_PTR);
        }
        let mut data = vec![0u8; size];
        if copy {
            // Safety: the caller guarantees `host_ptr` is valid for reads of `size` bytes.
            unsafe {
                ptr::copy_nonoverlapping(host_ptr as *const u8, data.as_mut_ptr(), size);
            }
        }
        let mem = state.create();
        state.mems.insert(mem, MemState { data });
        Ok(mem)
    }
    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let mut state = self.state.lock();
        state.fail("create_image")?;
        if !state.contexts.contains_key(&context) {
            return Err(Status::INVALID_CONTEXT);
        }
        let depth_ok = match desc.image_type {
            MemObjectType::Image2d => desc.depth <= 1,
            MemObjectType::Image3d => desc.depth > 1,
            MemObjectType::Buffer => false,
        };
        if !depth_ok {
            return Err(Status::INVALID_IMAGE_FORMAT_DESCRIPTOR);
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Status::INVALID_IMAGE_SIZE);
        }
        let min_row_pitch = desc.width * format.pixel_size();
        if desc.row_pitch != 0 && (host_ptr.is_null() || desc.row_pitch < min_row_pitch) {
            return Err(Status::INVALID_IMAGE_SIZE);
        }
        let copy = flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR);
        if copy == host_ptr.is_null() {
            return Err(Status::INVALID_HOST_PTR);
        }
        let size = desc.host_size(format);
        let mut data = vec![0u8; size];
        if copy {
            // Safety: the caller guarantees `host_ptr` is valid for reads of `size` bytes.
            unsafe {
                ptr::copy_nonoverlapping(host_ptr as *const u8, data.as_mut_ptr(), size);
            }
        }
        let mem = state.create();
        state.mems.insert(mem, MemState { data });
        Ok(mem)
    }
    fn create_program_with_source(
        &self,
        context: RawContext,
        source: &str,
    ) -> Result<RawProgram, Status> {
        let mut state = self.state.lock();
        state.fail("create_program_with_source")?;
        if !state.contexts.contains_key(&context) {
            return Err(Status::INVALID_CONTEXT);
        }
        if source.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let program = state.create();
        state.programs.insert(
            program,
            ProgramState {
                context,
                source: source.to_string(),
                builds: HashMap::new(),
                entry_points: None,
            },
        );
        Ok(program)
    }
    fn build_program(
        &self,
        program: RawProgram,
        devices: &[RawDevice],
        options: &str,
    ) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::BuildProgram {
            program,
            devices: devices.to_vec(),
            options: options.to_string(),
        });
        state.fail("build_program")?;
        let context = state
            .programs
            .get(&program)
            .ok_or(Status::INVALID_PROGRAM)?
            .context;
        let context_devices = state
            .contexts
            .get(&context)
            .map(|x| x.devices.clone())
            .unwrap_or_default();
        let devices = if devices.is_empty() {
            context_devices
        } else if devices.iter().all(|x| context_devices.contains(x)) {
            devices.to_vec()
        } else {
            return Err(Status::INVALID_DEVICE);
        };
        let Some(program) = state.programs.get_mut(&program) else {
            return Err(Status::INVALID_PROGRAM);
        };
        let result = compile(&program.source);
        let (status, log) = match &result {
            Ok(_) => (BuildStatus::Success, String::new()),
            Err(log) => (BuildStatus::Error, log.clone()),
        };
        for device in devices {
            program.builds.insert(
                device,
                BuildState {
                    status: Some(status),
                    options: options.to_string(),
                    log: log.clone(),
                },
            );
        }
        match result {
            Ok(entry_points) => {
                program.entry_points.replace(entry_points);
                Ok(())
            }
            Err(_) => Err(Status::BUILD_PROGRAM_FAILURE),
        }
    }
    fn program_build_info(
        &self,
        program: RawProgram,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        use info::program_build::*;
        let mut state = self.state.lock();
        state.calls.push(MockCall::ProgramBuildInfo {
            program,
            device,
            param,
            capacity: value.as_ref().map(|x| x.len()),
        });
        state.fail("program_build_info")?;
        if !state.devices.contains_key(&device) {
            return Err(Status::INVALID_DEVICE);
        }
        let program = state.programs.get(&program).ok_or(Status::INVALID_PROGRAM)?;
        let empty = BuildState::default();
        let build = program.builds.get(&device).unwrap_or(&empty);
        let bytes = match param {
            STATUS => encode(build.status.unwrap_or(BuildStatus::None).to_raw()),
            OPTIONS => encode_str(&build.options),
            LOG => encode_str(&build.log),
            _ => return Err(Status::INVALID_VALUE),
        };
        write_info(&bytes, value)
    }
    fn create_kernel(&self, program: RawProgram, name: &str) -> Result<RawKernel, Status> {
        let mut state = self.state.lock();
        state.fail("create_kernel")?;
        let program = state.programs.get(&program).ok_or(Status::INVALID_PROGRAM)?;
        let entry_points = program
            .entry_points
            .as_ref()
            .ok_or(Status::INVALID_PROGRAM_EXECUTABLE)?;
        let params = entry_points
            .iter()
            .find(|x| x.name == name)
            .ok_or(Status::INVALID_KERNEL_NAME)?
            .params
            .clone();
        let kernel = state.create();
        state.kernels.insert(
            kernel,
            KernelState {
                args: vec![false; params.len()],
                params,
            },
        );
        Ok(kernel)
    }
    fn set_kernel_arg(
        &self,
        kernel: RawKernel,
        index: u32,
        value: ArgValue<'_>,
    ) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::SetKernelArg {
            kernel,
            index,
            size: value.size(),
        });
        state.fail("set_kernel_arg")?;
        let State { kernels, mems, .. } = &mut *state;
        let kernel = kernels.get_mut(&kernel).ok_or(Status::INVALID_KERNEL)?;
        let param = *kernel
            .params
            .get(index as usize)
            .ok_or(Status::INVALID_ARG_INDEX)?;
        match (param, value) {
            (_, value) if value.size() == 0 => return Err(Status::INVALID_ARG_SIZE),
            (Param::Local, ArgValue::Local(_)) | (Param::Value, ArgValue::Bytes(_)) => {}
            (Param::Mem, ArgValue::Bytes(bytes)) => {
                if bytes.len() != size_of::<RawMem>() {
                    return Err(Status::INVALID_ARG_SIZE);
                }
                let mem: RawMem = bytemuck::pod_read_unaligned(bytes);
                if !mems.contains_key(&mem) {
                    return Err(Status::INVALID_MEM_OBJECT);
                }
            }
            _ => return Err(Status::INVALID_ARG_VALUE),
        }
        kernel.args[index as usize] = true;
        Ok(())
    }
    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status> {
        let mut state = self.state.lock();
        state.fail("create_command_queue")?;
        let ctx = state.contexts.get(&context).ok_or(Status::INVALID_CONTEXT)?;
        if !ctx.devices.contains(&device) {
            return Err(Status::INVALID_DEVICE);
        }
        if !QueueProperties::all().contains(properties) {
            return Err(Status::INVALID_QUEUE_PROPERTIES);
        }
        let queue = state.create();
        state.queues.insert(queue, QueueState { device });
        Ok(queue)
    }
    unsafe fn enqueue_read_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        dst: *mut c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_read_buffer")?;
        state.check_queue(queue)?;
        state.check_wait_list(wait_list)?;
        if dst.is_null() {
            return Err(Status::INVALID_VALUE);
        }
        let src = state.mem_range(buffer, offset, size)?;
        // Safety: the caller guarantees `dst` is valid for writes of `size` bytes.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, size);
        }
        let event = state.new_event(queue, CommandType::ReadBuffer, wait_list);
        state.calls.push(MockCall::ReadBuffer {
            queue,
            buffer,
            blocking,
            offset,
            size,
            wait_list: wait_list.to_vec(),
            event,
        });
        if blocking {
            self.wait_complete(&mut state, &[event])?;
        }
        Ok(event)
    }
    unsafe fn enqueue_write_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        src: *const c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_write_buffer")?;
        state.check_queue(queue)?;
        state.check_wait_list(wait_list)?;
        if src.is_null() {
            return Err(Status::INVALID_VALUE);
        }
        let dst = state.mem_range(buffer, offset, size)?;
        // Safety: the caller guarantees `src` is valid for reads of `size` bytes.
        unsafe {
            ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), size);
        }
        let event = state.new_event(queue, CommandType::WriteBuffer, wait_list);
        state.calls.push(MockCall::WriteBuffer {
            queue,
            buffer,
            blocking,
            offset,
            size,
            wait_list: wait_list.to_vec(),
            event,
        });
        if blocking {
            self.wait_complete(&mut state, &[event])?;
        }
        Ok(event)
    }
    fn enqueue_copy_buffer(
        &self,
        queue: RawQueue,
        src: RawMem,
        dst: RawMem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_copy_buffer")?;
        state.check_queue(queue)?;
        state.check_wait_list(wait_list)?;
        if src == dst {
            let overlap = src_offset < dst_offset + size && dst_offset < src_offset + size;
            if overlap {
                return Err(Status::MEM_COPY_OVERLAP);
            }
        }
        let bytes = state.mem_range(src, src_offset, size)?.to_vec();
        state
            .mem_range(dst, dst_offset, size)?
            .copy_from_slice(&bytes);
        let event = state.new_event(queue, CommandType::CopyBuffer, wait_list);
        state.calls.push(MockCall::CopyBuffer {
            queue,
            src,
            dst,
            size,
            wait_list: wait_list.to_vec(),
            event,
        });
        Ok(event)
    }
    fn enqueue_nd_range_kernel(
        &self,
        queue: RawQueue,
        kernel: RawKernel,
        global_work_offset: Option<&[usize]>,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_nd_range_kernel")?;
        state.check_queue(queue)?;
        let args_set = state
            .kernels
            .get(&kernel)
            .ok_or(Status::INVALID_KERNEL)?
            .args
            .iter()
            .all(|x| *x);
        let dims = global_work_size.len();
        if !(1..=3).contains(&dims) {
            return Err(Status::INVALID_WORK_DIMENSION);
        }
        if global_work_size.contains(&0) {
            return Err(Status::INVALID_GLOBAL_WORK_SIZE);
        }
        if global_work_offset.map_or(false, |x| x.len() != dims) {
            return Err(Status::INVALID_GLOBAL_OFFSET);
        }
        if let Some(local) = local_work_size {
            let max = state
                .queues
                .get(&queue)
                .and_then(|x| state.devices.get(&x.device))
                .and_then(|x| x.properties.get(&info::device::MAX_WORK_GROUP_SIZE))
                .and_then(|x| bytemuck::try_pod_read_unaligned::<usize>(x).ok())
                .unwrap_or(usize::MAX);
            let divides = local.len() == dims
                && local
                    .iter()
                    .zip(global_work_size)
                    .all(|(l, g)| *l != 0 && g % l == 0);
            if !divides || local.iter().product::<usize>() > max {
                return Err(Status::INVALID_WORK_GROUP_SIZE);
            }
        }
        if !args_set {
            return Err(Status::INVALID_KERNEL_ARGS);
        }
        state.check_wait_list(wait_list)?;
        let event = state.new_event(queue, CommandType::NdRangeKernel, wait_list);
        state.calls.push(MockCall::NdRangeKernel {
            queue,
            kernel,
            global: global_work_size.to_vec(),
            local: local_work_size.map(<[usize]>::to_vec),
            wait_list: wait_list.to_vec(),
            event,
        });
        Ok(event)
    }
    fn enqueue_marker(&self, queue: RawQueue, wait_list: &[RawEvent]) -> Result<RawEvent, Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_marker")?;
        state.check_queue(queue)?;
        state.check_wait_list(wait_list)?;
        let event = state.new_event(queue, CommandType::Marker, wait_list);
        state.calls.push(MockCall::Marker {
            queue,
            wait_list: wait_list.to_vec(),
            event,
        });
        Ok(event)
    }
    fn enqueue_wait_for_events(&self, queue: RawQueue, events: &[RawEvent]) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("enqueue_wait_for_events")?;
        state.check_queue(queue)?;
        if events.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        if !events.iter().all(|x| state.events.contains_key(x)) {
            return Err(Status::INVALID_EVENT);
        }
        state.calls.push(MockCall::EnqueueWaitForEvents {
            queue,
            events: events.to_vec(),
        });
        Ok(())
    }
    fn flush(&self, queue: RawQueue) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("flush")?;
        state.check_queue(queue)?;
        state.calls.push(MockCall::Flush { queue });
        Ok(())
    }
    fn finish(&self, queue: RawQueue) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("finish")?;
        state.check_queue(queue)?;
        state.calls.push(MockCall::Finish { queue });
        let events: Vec<RawEvent> = state
            .events
            .iter()
            .filter(|(_, x)| x.queue == queue)
            .map(|(raw, _)| *raw)
            .collect();
        self.wait_complete(&mut state, &events)
    }
    fn wait_for_events(&self, events: &[RawEvent]) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::WaitForEvents {
            events: events.to_vec(),
        });
        state.fail("wait_for_events")?;
        if events.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        self.wait_complete(&mut state, events)
    }
    fn event_info(
        &self,
        event: RawEvent,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        use info::event::*;
        let mut state = self.state.lock();
        state.calls.push(MockCall::EventInfo {
            event,
            param,
            capacity: value.as_ref().map(|x| x.len()),
        });
        state.fail("event_info")?;
        let ev = state.events.get(&event).ok_or(Status::INVALID_EVENT)?;
        let bytes = match param {
            COMMAND_QUEUE => encode(ev.queue),
            COMMAND_TYPE => encode(ev.command_type.to_raw()),
            REFERENCE_COUNT => encode(state.ref_counts.get(&event.addr()).copied().unwrap_or(0)),
            COMMAND_EXECUTION_STATUS => encode(ev.status.to_raw()),
            _ => return Err(Status::INVALID_VALUE),
        };
        write_info(&bytes, value)
    }
    fn retain_context(&self, context: RawContext) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_context")?;
        let exists = state.contexts.contains_key(&context);
        state.retain(context.addr(), exists, Status::INVALID_CONTEXT)
    }
    fn release_context(&self, context: RawContext) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_context")?;
        let exists = state.contexts.contains_key(&context);
        if state.release(context.addr(), exists, Status::INVALID_CONTEXT)? {
            state.contexts.remove(&context);
        }
        Ok(())
    }
    fn retain_mem_object(&self, mem: RawMem) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_mem_object")?;
        let exists = state.mems.contains_key(&mem);
        state.retain(mem.addr(), exists, Status::INVALID_MEM_OBJECT)
    }
    fn release_mem_object(&self, mem: RawMem) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_mem_object")?;
        let exists = state.mems.contains_key(&mem);
        if state.release(mem.addr(), exists, Status::INVALID_MEM_OBJECT)? {
            state.mems.remove(&mem);
        }
        Ok(())
    }
    fn retain_program(&self, program: RawProgram) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_program")?;
        let exists = state.programs.contains_key(&program);
        state.retain(program.addr(), exists, Status::INVALID_PROGRAM)
    }
    fn release_program(&self, program: RawProgram) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_program")?;
        let exists = state.programs.contains_key(&program);
        if state.release(program.addr(), exists, Status::INVALID_PROGRAM)? {
            state.programs.remove(&program);
        }
        Ok(())
    }
    fn retain_kernel(&self, kernel: RawKernel) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_kernel")?;
        let exists = state.kernels.contains_key(&kernel);
        state.retain(kernel.addr(), exists, Status::INVALID_KERNEL)
    }
    fn release_kernel(&self, kernel: RawKernel) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_kernel")?;
        let exists = state.kernels.contains_key(&kernel);
        if state.release(kernel.addr(), exists, Status::INVALID_KERNEL)? {
            state.kernels.remove(&kernel);
        }
        Ok(())
    }
    fn retain_command_queue(&self, queue: RawQueue) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_command_queue")?;
        let exists = state.queues.contains_key(&queue);
        state.retain(queue.addr(), exists, Status::INVALID_COMMAND_QUEUE)
    }
    fn release_command_queue(&self, queue: RawQueue) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_command_queue")?;
        let exists = state.queues.contains_key(&queue);
        if state.release(queue.addr(), exists, Status::INVALID_COMMAND_QUEUE)? {
            state.queues.remove(&queue);
        }
        Ok(())
    }
    fn retain_event(&self, event: RawEvent) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("retain_event")?;
        let exists = state.events.contains_key(&event);
        state.retain(event.addr(), exists, Status::INVALID_EVENT)
    }
    fn release_event(&self, event: RawEvent) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.fail("release_event")?;
        let exists = state.events.contains_key(&event);
        if state.release(event.addr(), exists, Status::INVALID_EVENT)? {
            state.events.remove(&event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    fn context(mock: &MockProvider) -> RawContext {
        let platform = mock.platforms()[0];
        let devices = mock.devices(platform);
        mock.create_context(platform, &devices).unwrap()
    }

    #[test]
    fn mock_compile_entry_points() {
        let source = "
            int twice(int x) { return 2 * x; }
            __kernel void add(__global float *a, __global const float *b, float alpha) {}
            kernel void scratch(__local int *tmp) {}
            __kernel void empty(void) {}
        ";
        let entry_points = compile(source).unwrap();
        let names: Vec<_> = entry_points.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(names, ["add", "scratch", "empty"]);
        assert_eq!(
            entry_points[0].params,
            [Param::Mem, Param::Mem, Param::Value]
        );
        assert_eq!(entry_points[1].params, [Param::Local]);
        assert!(entry_points[2].params.is_empty());
    }

    #[test]
    fn mock_compile_diagnostics() {
        assert_eq!(
            compile("__kernel void k( {}").err().unwrap(),
            "1:16: error: unclosed '('\n"
        );
        assert_eq!(
            compile("__kernel void k() {\n}}").err().unwrap(),
            "2:2: error: unexpected '}'\n"
        );
    }

    #[test]
    fn mock_info_requires_capacity() {
        let mock = MockProvider::default();
        let platform = mock.platforms()[0];
        let size = mock.platform_info(platform, info::platform::NAME, None).unwrap();
        assert_eq!(size, "Mock Platform".len() + 1);
        let mut small = vec![0u8; size - 1];
        assert_eq!(
            mock.platform_info(platform, info::platform::NAME, Some(&mut small)),
            Err(Status::INVALID_VALUE)
        );
    }

    #[test]
    fn mock_device_type_filter() {
        let mock = MockProvider::new([MockPlatform::new("p")
            .with_device(MockDevice::new("cpu", DeviceType::CPU))
            .with_device(MockDevice::new("gpu", DeviceType::GPU))]);
        let platform = mock.platforms()[0];
        assert_eq!(mock.device_ids(platform, DeviceType::ALL, None), Ok(2));
        assert_eq!(mock.device_ids(platform, DeviceType::GPU, None), Ok(1));
        assert_eq!(mock.device_ids(platform, DeviceType::DEFAULT, None), Ok(1));
        assert_eq!(
            mock.device_ids(platform, DeviceType::ACCELERATOR, None),
            Err(Status::DEVICE_NOT_FOUND)
        );
    }

    #[test]
    fn mock_ref_counts() {
        let mock = MockProvider::default();
        let context = context(&mock);
        assert_eq!(mock.ref_count(context), Some(1));
        mock.retain_context(context).unwrap();
        assert_eq!(mock.ref_count(context), Some(2));
        mock.release_context(context).unwrap();
        mock.release_context(context).unwrap();
        assert!(!mock.is_live(context));
        assert_eq!(mock.release_context(context), Err(Status::INVALID_CONTEXT));
        assert_eq!((mock.retains(context), mock.releases(context)), (1, 2));
    }

    #[test]
    fn mock_fail_next_once() {
        let mock = MockProvider::default();
        mock.fail_next("platform_ids", Status::OUT_OF_HOST_MEMORY);
        assert_eq!(mock.platform_ids(None), Err(Status::OUT_OF_HOST_MEMORY));
        assert_eq!(mock.platform_ids(None), Ok(1));
    }

    #[test]
    fn mock_blocking_read_waits_for_completion() {
        let mock = Arc::new(MockProvider::default());
        let context = context(&mock);
        let device = mock.devices(mock.platforms()[0])[0];
        let queue = mock
            .create_command_queue(context, device, QueueProperties::empty())
            .unwrap();
        let data = [1u8, 2, 3, 4];
        let buffer = unsafe {
            mock.create_buffer(
                context,
                MemFlags::COPY_HOST_PTR,
                4,
                data.as_ptr() as *mut c_void,
            )
        }
        .unwrap();
        mock.set_manual_completion(true);
        let completed = Arc::new(AtomicBool::new(false));
        let completer = {
            let mock = mock.clone();
            let completed = completed.clone();
            thread::spawn(move || {
                while mock.pending_events().is_empty() {
                    thread::sleep(Duration::from_millis(1));
                }
                thread::sleep(Duration::from_millis(20));
                completed.store(true, Ordering::SeqCst);
                mock.complete_all();
            })
        };
        let mut out = [0u8; 4];
        let event = unsafe {
            mock.enqueue_read_buffer(
                queue,
                buffer,
                true,
                0,
                4,
                out.as_mut_ptr() as *mut c_void,
                &[],
            )
        }
        .unwrap();
        assert!(completed.load(Ordering::SeqCst));
        assert!(mock.pending_events().is_empty());
        completer.join().unwrap();
        assert_eq!(out, data);
        assert!(mock.pending_events().is_empty());
        mock.release_event(event).unwrap();
    }
}
