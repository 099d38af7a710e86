use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Spreads the low 16 bits of `v` so they occupy the even bit positions.
fn spread_bits(v: u32) -> u32 {
    let mut x = v & 0x0000_ffff;
    x = (x | (x << 8)) & 0x00ff_00ff;
    x = (x | (x << 4)) & 0x0f0f_0f0f;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

fn quantize(t: f32) -> u32 {
    (t.clamp(0.0, 1.0) * 65535.0).round() as u32
}

/// 32-bit Morton key of a unit vector: azimuth in the even bits, polar angle in the odd bits.
pub fn morton_code(p: Vec3) -> u32 {
    let azimuth = (p.z.atan2(p.x) + PI) / TAU;
    let polar = p.y.clamp(-1.0, 1.0).acos() / PI;
    spread_bits(quantize(azimuth)) | (spread_bits(quantize(polar)) << 1)
}

/// Stable binary radix sort of `items` by `key(item)`, one pass per bit.
pub fn radix_sort_by_key<T: Copy>(items: &mut Vec<T>, key: impl Fn(&T) -> u32) {
    let mut zeros = Vec::with_capacity(items.len());
    let mut ones = Vec::with_capacity(items.len());
    for bit in 0..32 {
        zeros.clear();
        ones.clear();
        for item in items.iter() {
            if key(item) >> bit & 1 == 0 {
                zeros.push(*item);
            } else {
                ones.push(*item);
            }
        }
        items.clear();
        items.extend_from_slice(&zeros);
        items.extend_from_slice(&ones);
    }
}
