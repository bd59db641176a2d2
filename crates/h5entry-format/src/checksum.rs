//! Metadata checksums: Bob Jenkins' lookup3 `hashlittle`.
//!
//! HDF5 seals superblocks (v2+), object header chunks and most other
//! metadata blocks with this hash, seeded with zero.

use byteorder::{ByteOrder, LittleEndian};

/// Compute the lookup3 checksum HDF5 stores after a metadata block.
pub fn jenkins_lookup3(data: &[u8]) -> u32 {
    hashlittle(data, 0)
}

fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c) ^ c.rotate_left(4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a) ^ a.rotate_left(6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b) ^ b.rotate_left(8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c) ^ c.rotate_left(16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a) ^ a.rotate_left(19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b) ^ b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(14));
    *a = (*a ^ *c).wrapping_sub(c.rotate_left(11));
    *b = (*b ^ *a).wrapping_sub(a.rotate_left(25));
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(16));
    *a = (*a ^ *c).wrapping_sub(c.rotate_left(4));
    *b = (*b ^ *a).wrapping_sub(a.rotate_left(14));
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(24));
}

fn add_block(block: &[u8], a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_add(LittleEndian::read_u32(&block[0..4]));
    *b = b.wrapping_add(LittleEndian::read_u32(&block[4..8]));
    *c = c.wrapping_add(LittleEndian::read_u32(&block[8..12]));
}

fn hashlittle(data: &[u8], initval: u32) -> u32 {
    let seed = 0xdead_beef_u32
        .wrapping_add(data.len() as u32)
        .wrapping_add(initval);
    let (mut a, mut b, mut c) = (seed, seed, seed);

    // Every 12-byte block except the last one goes through `mix`; the last
    // (possibly short) block goes through `final_mix` instead.
    let mut rest = data;
    while rest.len() > 12 {
        add_block(&rest[..12], &mut a, &mut b, &mut c);
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }
    if rest.is_empty() {
        return c;
    }

    // The reference switch adds the trailing bytes little-endian into a/b/c,
    // which is the same as reading a zero-padded 12-byte block.
    let mut tail = [0u8; 12];
    tail[..rest.len()].copy_from_slice(rest);
    add_block(&tail, &mut a, &mut b, &mut c);
    final_mix(&mut a, &mut b, &mut c);
    c
}
