use wgpu::{BindGroup, BindGroupLayout};

use crate::utils::double_buffer::Side;

/// A layout plus one bind group per combination of double-buffer sides.
///
/// With `n` double buffers bound, group `i` is the one whose buffer `k`
/// reads its ping region when bit `k` of `i` is clear.
pub struct BindResources {
    pub bind_group_layout: BindGroupLayout,
    bind_groups: Vec<BindGroup>,
}

impl BindResources {
    pub fn new(bind_group_layout: BindGroupLayout, bind_groups: Vec<BindGroup>) -> Self {
        Self {
            bind_group_layout,
            bind_groups,
        }
    }

    /// Bind group matching the current side of every bound double buffer.
    pub fn bind_group(&self, sides: &[Side]) -> &BindGroup {
        &self.bind_groups[Self::index(sides)]
    }

    pub fn index(sides: &[Side]) -> usize {
        sides
            .iter()
            .enumerate()
            .map(|(bit, side)| match side {
                Side::Ping => 0,
                Side::Pong => 1 << bit,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_map_to_bit_patterns() {
        assert_eq!(BindResources::index(&[Side::Ping]), 0);
        assert_eq!(BindResources::index(&[Side::Pong]), 1);
        assert_eq!(BindResources::index(&[Side::Ping, Side::Pong]), 2);
        assert_eq!(BindResources::index(&[Side::Pong, Side::Pong]), 3);
    }
}
