use crate::engine::{format_address, Error, Instruction};
use capstone::prelude::*;
use itertools::Itertools;
use lru::LruCache;
use object::{Object, ObjectSection, ObjectSymbol, SectionKind, SymbolKind};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Executable section of an image.
#[derive(Debug, Clone)]
pub struct CodeSection {
    pub name: String,
    pub address: u64,
    pub data: Vec<u8>,
}

impl CodeSection {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.address && addr < self.address + self.data.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

/// Code and function symbols of an executable file.
#[derive(Debug)]
pub struct Image {
    sections: Vec<CodeSection>,
    /// Sorted by address.
    symbols: Vec<Symbol>,
    entry: u64,
}

impl Image {
    /// Load executable sections and function symbols from an object file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = fs::File::open(path.as_ref())?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let object = object::File::parse(&*mmap)?;

        let sections = object
            .sections()
            .filter(|section| section.kind() == SectionKind::Text && section.address() != 0)
            .map(|section| -> Result<_, Error> {
                Ok(CodeSection {
                    name: section.name().unwrap_or("???").to_string(),
                    address: section.address(),
                    data: section.data()?.to_vec(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let symbols = object
            .symbols()
            .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.address() != 0)
            .filter_map(|symbol| {
                let name = symbol.name().ok()?;
                Some(Symbol {
                    name: format!("{:#}", rustc_demangle::demangle(name)),
                    address: symbol.address(),
                    size: symbol.size(),
                })
            })
            .collect();

        Self::from_parts(sections, symbols, object.entry())
    }

    /// Create image from already extracted parts.
    pub fn from_parts(
        sections: Vec<CodeSection>,
        mut symbols: Vec<Symbol>,
        entry: u64,
    ) -> Result<Self, Error> {
        if sections.is_empty() {
            return Err(Error::NoCode);
        }

        symbols.sort_by_key(|s| s.address);
        symbols.dedup_by_key(|s| s.address);

        let entry = if sections.iter().any(|s| s.contains(entry)) {
            entry
        } else {
            sections[0].address
        };

        Ok(Self {
            sections,
            symbols,
            entry,
        })
    }

    /// Image entry point, or the start of a first code section if the entry point is not
    /// inside the code.
    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.section_at(addr).is_some()
    }

    fn section_at(&self, addr: u64) -> Option<&CodeSection> {
        self.sections.iter().find(|s| s.contains(addr))
    }

    /// Return code from `addr` up to the end of its section.
    fn code_at(&self, addr: u64) -> Result<&[u8], Error> {
        let section = self.section_at(addr).ok_or(Error::UnknownAddress(addr))?;
        Ok(&section.data[(addr - section.address) as usize..])
    }

    /// Return `symbol+offset` representation of address.
    pub fn symbolize(&self, addr: u64) -> Option<String> {
        let idx = self.symbols.partition_point(|s| s.address <= addr);
        let symbol = &self.symbols[idx.checked_sub(1)?];
        let offset = addr - symbol.address;
        if symbol.size != 0 && offset >= symbol.size {
            return None;
        }

        if offset == 0 {
            Some(symbol.name.clone())
        } else {
            Some(format!("{}+{offset:#X}", symbol.name))
        }
    }
}

/// Decoded instruction with a raw address and length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    pub address: u64,
    pub size: usize,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
    pub op_str: String,
}

impl RawInstruction {
    pub fn next_address(&self) -> u64 {
        self.address + self.size as u64
    }

    /// Return target address of a direct branch (`call 0x401000`).
    pub fn direct_target(&self) -> Option<u64> {
        let op = self.op_str.trim();
        if op.starts_with('*') || op.contains('%') || op.contains(',') {
            return None;
        }
        let op = op.trim_start_matches('$');
        op.strip_prefix("0x")
            .and_then(|digits| u64::from_str_radix(digits, 16).ok())
    }

    pub fn is_call(&self) -> bool {
        self.mnemonic.starts_with("call")
    }

    pub fn is_ret(&self) -> bool {
        self.mnemonic.starts_with("ret")
    }

    pub fn is_jmp(&self) -> bool {
        self.mnemonic.starts_with("jmp")
    }
}

/// Generate disassembled code of image sections.
pub struct Disassembler {
    cache: Mutex<LruCache<(u64, usize), Vec<Instruction>>>,
}

impl Disassembler {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(64).expect("infallible"))),
        }
    }

    fn capstone() -> Result<Capstone, Error> {
        Capstone::new()
            .x86()
            .mode(arch::x86::ArchMode::Mode64)
            .syntax(arch::x86::ArchSyntax::Att)
            .build()
            .map_err(Error::DisAsmInit)
    }

    /// Decode up to `count` instructions starting at `addr`.
    pub fn decode(
        &self,
        image: &Image,
        addr: u64,
        count: usize,
    ) -> Result<Vec<RawInstruction>, Error> {
        let code = image.code_at(addr)?;
        let cs = Self::capstone()?;
        let instructions = cs.disasm_count(code, addr, count).map_err(Error::DisAsm)?;

        Ok(instructions
            .iter()
            .map(|i| RawInstruction {
                address: i.address(),
                size: i.bytes().len(),
                bytes: i.bytes().to_vec(),
                mnemonic: i.mnemonic().unwrap_or("???").to_string(),
                op_str: i.op_str().unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Return instruction window of `count` instructions starting at `addr`.
    pub fn window(&self, image: &Image, addr: u64, count: usize) -> Result<Vec<Instruction>, Error> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let instructions = cache.try_get_or_insert((addr, count), || -> Result<_, Error> {
            Ok(self
                .decode(image, addr, count)?
                .into_iter()
                .map(|raw| Instruction {
                    address: format_address(raw.address),
                    symbol: image.symbolize(raw.address).unwrap_or_default(),
                    bytes: raw.bytes.iter().map(|b| format!("{b:02x}")).join(" "),
                    mnemonic: raw.mnemonic,
                    op_str: raw.op_str,
                })
                .collect())
        })?;

        Ok(instructions.clone())
    }
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}
