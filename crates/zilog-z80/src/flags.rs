//! Z80 flag register bits.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented bit 5. Never computed; carried through unchanged.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented bit 3. Never computed; carried through unchanged.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

/// Compute parity of a byte (true if even number of 1 bits).
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones().is_multiple_of(2)
}

/// S, Z and P/V bits for a logical result.
#[must_use]
pub const fn szp(value: u8) -> u8 {
    let mut f = value & SF;
    if value == 0 {
        f |= ZF;
    }
    if parity(value) {
        f |= PF;
    }
    f
}

/// Replace S, Z and P/V in `flags` with those of `value`.
#[must_use]
pub const fn with_szp(flags: u8, value: u8) -> u8 {
    (flags & !(SF | ZF | PF)) | szp(value)
}

/// Set or clear `mask` in `flags`.
#[must_use]
pub const fn set_if(flags: u8, mask: u8, condition: bool) -> u8 {
    if condition { flags | mask } else { flags & !mask }
}
