use std::ops::RangeInclusive;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const MAIN_COUNT: usize = 5;
pub const LUCKY_COUNT: usize = 2;
pub const SLOT_COUNT: usize = MAIN_COUNT + LUCKY_COUNT;

/// One historical or candidate outcome: 5 main numbers followed by 2 lucky numbers.
///
/// Slots keep the order they were recorded in. Historical main blocks are not
/// guaranteed to be sorted, and equality/hashing is per position, so two draws
/// collide exactly when their zero-padded tuples are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Draw {
    pub main: [u8; MAIN_COUNT],
    pub lucky: [u8; LUCKY_COUNT],
}

impl Draw {
    pub fn new(main: [u8; MAIN_COUNT], lucky: [u8; LUCKY_COUNT]) -> Self {
        Self { main, lucky }
    }

    pub fn from_slots(slots: [u8; SLOT_COUNT]) -> Self {
        let mut main = [0u8; MAIN_COUNT];
        let mut lucky = [0u8; LUCKY_COUNT];
        main.copy_from_slice(&slots[..MAIN_COUNT]);
        lucky.copy_from_slice(&slots[MAIN_COUNT..]);
        Self { main, lucky }
    }

    pub fn slots(&self) -> [u8; SLOT_COUNT] {
        let mut slots = [0u8; SLOT_COUNT];
        slots[..MAIN_COUNT].copy_from_slice(&self.main);
        slots[MAIN_COUNT..].copy_from_slice(&self.lucky);
        slots
    }

    /// Parses a raw record of exactly 7 numeric fields (`"07"`, `"7"` and `" 07 "` are equivalent).
    pub fn parse_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() != SLOT_COUNT {
            bail!("Expected {} numbers, got {}", SLOT_COUNT, fields.len());
        }
        let mut slots = [0u8; SLOT_COUNT];
        for (slot, field) in slots.iter_mut().zip(fields) {
            let raw = field.as_ref().trim();
            let n = raw
                .parse::<u8>()
                .with_context(|| format!("Not a number: '{}'", raw))?;
            if !(1..=99).contains(&n) {
                bail!("Number {} is not a two-digit value", n);
            }
            *slot = n;
        }
        Ok(Self::from_slots(slots))
    }

    /// Zero-padded two-digit form of every slot.
    pub fn to_fields(&self) -> Vec<String> {
        self.slots().iter().map(|n| pad2(*n)).collect()
    }

    /// Canonical key, e.g. `"03,17,22,38,45,04,09"`.
    pub fn key(&self) -> String {
        self.to_fields().join(",")
    }
}

impl std::fmt::Display for Draw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_fields().join(", "))
    }
}

impl TryFrom<Vec<String>> for Draw {
    type Error = anyhow::Error;

    fn try_from(fields: Vec<String>) -> Result<Self> {
        Self::parse_fields(&fields)
    }
}

impl From<Draw> for Vec<String> {
    fn from(draw: Draw) -> Self {
        draw.to_fields()
    }
}

pub fn pad2(n: u8) -> String {
    format!("{:02}", n)
}

/// A draw as stored, with its date when the source provides one.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub date: Option<String>,
    pub draw: Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Main,
    Lucky,
}

impl Block {
    pub fn default_range(&self) -> RangeInclusive<u8> {
        match self {
            Block::Main => 1..=50,
            Block::Lucky => 1..=11,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Block::Main => MAIN_COUNT,
            Block::Lucky => LUCKY_COUNT,
        }
    }

    pub fn numbers_from<'a>(&self, draw: &'a Draw) -> &'a [u8] {
        match self {
            Block::Main => &draw.main,
            Block::Lucky => &draw.lucky,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Block::Main => "main",
            Block::Lucky => "lucky",
        }
    }
}

/// Strict check for user-entered combinations: declared ranges and no repeats within a block.
pub fn validate_draw(
    draw: &Draw,
    main_range: &RangeInclusive<u8>,
    lucky_range: &RangeInclusive<u8>,
) -> Result<()> {
    for (block, range) in [(Block::Main, main_range), (Block::Lucky, lucky_range)] {
        let numbers = block.numbers_from(draw);
        for &n in numbers {
            if !range.contains(&n) {
                bail!(
                    "{} number {} out of range ({}-{})",
                    block.label(),
                    n,
                    range.start(),
                    range.end()
                );
            }
        }
        for i in 0..numbers.len() {
            for j in (i + 1)..numbers.len() {
                if numbers[i] == numbers[j] {
                    bail!("Duplicate {} number: {}", block.label(), numbers[i]);
                }
            }
        }
    }
    Ok(())
}
