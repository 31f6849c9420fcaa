use std::collections::BTreeMap;

use srdp_frame::{FrameHeader, RegisterError};

/// The addressed window of a register access.
///
/// `length` is the number of value bytes requested for a read, or supplied
/// for a write. A read with `length == 0` asks for everything from
/// `position` to the end of the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    pub device: u16,
    pub register: u16,
    pub position: u16,
    pub length: u16,
}

impl RegisterAddress {
    pub fn new(device: u16, register: u16) -> Self {
        Self {
            device,
            register,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, position: u16, length: u16) -> Self {
        self.position = position;
        self.length = length;
        self
    }

    pub fn from_header(header: &FrameHeader) -> Self {
        Self {
            device: header.device,
            register: header.register,
            position: header.position,
            length: header.length,
        }
    }
}

/// Register storage behind a channel.
///
/// The channel owns the protocol; the implementation owns the values. Both
/// methods default to [`RegisterError::NotImplemented`], so a device that
/// only reports changes can implement nothing at all.
pub trait RegisterAccess {
    /// Copy the addressed window into `out` and return the number of bytes
    /// written. `out` is sized to the channel's payload limit.
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        let _ = (addr, out);
        Err(RegisterError::NotImplemented)
    }

    /// Apply `data` at `addr.position` and return the number of bytes accepted.
    fn write(&mut self, addr: RegisterAddress, data: &[u8]) -> Result<usize, RegisterError> {
        let _ = (addr, data);
        Err(RegisterError::NotImplemented)
    }
}

impl RegisterAccess for () {}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &mut R {
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        (**self).read(addr, out)
    }

    fn write(&mut self, addr: RegisterAddress, data: &[u8]) -> Result<usize, RegisterError> {
        (**self).write(addr, data)
    }
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for Box<R> {
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        (**self).read(addr, out)
    }

    fn write(&mut self, addr: RegisterAddress, data: &[u8]) -> Result<usize, RegisterError> {
        (**self).write(addr, data)
    }
}

/// Copy the `position`/`length` window of `value` into `out`.
///
/// `length == 0` selects the rest of the value. Windows that run past the
/// value, or that do not fit in `out`, are rejected.
pub fn copy_window(
    value: &[u8],
    position: u16,
    length: u16,
    out: &mut [u8],
) -> Result<usize, RegisterError> {
    let start = usize::from(position);
    if start > value.len() {
        return Err(RegisterError::InvalidPositionOrLength);
    }
    let end = match length {
        0 => value.len(),
        n => start + usize::from(n),
    };
    if end > value.len() {
        return Err(RegisterError::InvalidPositionOrLength);
    }

    let window = &value[start..end];
    let dst = out
        .get_mut(..window.len())
        .ok_or(RegisterError::InvalidPositionOrLength)?;
    dst.copy_from_slice(window);
    Ok(window.len())
}

/// In-memory register bank.
///
/// Registers exist once inserted; writes may extend a value but never start
/// past its end.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegisters {
    values: BTreeMap<(u16, u16), Vec<u8>>,
}

impl MemoryRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) a register value.
    pub fn insert(&mut self, device: u16, register: u16, value: impl Into<Vec<u8>>) {
        self.values.insert((device, register), value.into());
    }

    pub fn get(&self, device: u16, register: u16) -> Option<&[u8]> {
        self.values.get(&(device, register)).map(Vec::as_slice)
    }

    /// Distinct device indices that have at least one register, ascending.
    pub fn devices(&self) -> Vec<u16> {
        let mut devices: Vec<u16> = self.values.keys().map(|(device, _)| *device).collect();
        devices.dedup();
        devices
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn has_device(&self, device: u16) -> bool {
        self.values
            .range((device, 0)..=(device, u16::MAX))
            .next()
            .is_some()
    }

    fn lookup_error(&self, device: u16) -> RegisterError {
        if self.has_device(device) {
            RegisterError::NoSuchRegister
        } else {
            RegisterError::NoSuchDevice
        }
    }
}

impl RegisterAccess for MemoryRegisters {
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        match self.values.get(&(addr.device, addr.register)) {
            Some(value) => copy_window(value, addr.position, addr.length, out),
            None => Err(self.lookup_error(addr.device)),
        }
    }

    fn write(&mut self, addr: RegisterAddress, data: &[u8]) -> Result<usize, RegisterError> {
        let Some(value) = self.values.get_mut(&(addr.device, addr.register)) else {
            return Err(self.lookup_error(addr.device));
        };

        let start = usize::from(addr.position);
        if start > value.len() {
            return Err(RegisterError::InvalidPositionOrLength);
        }
        let end = start + data.len();
        if end > value.len() {
            value.resize(end, 0);
        }
        value[start..end].copy_from_slice(data);
        Ok(data.len())
    }
}
