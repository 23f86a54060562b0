//! Sprite attachment interface and a CPU-side instance batch

use bytemuck::{Pod, Zeroable};
use cinder_core::{Color, Vec2, Vec3};

/// Opaque handle to an attached sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u32);

/// Everything needed to draw one particle sprite
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDesc {
    pub sprite: String,
    pub position: Vec3,
    pub size: Vec2,
    /// Offset of the sprite's corner from `position`
    pub offset: Vec2,
    /// Degrees
    pub rotation: f32,
    pub tint: Color,
    pub transparency: f32,
}

/// Receiver of particle sprites. Particles attach one sprite at spawn,
/// update it every frame while alive and detach it on expiry.
pub trait SpriteRenderer {
    fn attach(&mut self, desc: &SpriteDesc) -> RenderHandle;

    fn set_transparency(&mut self, handle: RenderHandle, transparency: f32);

    fn set_position(&mut self, handle: RenderHandle, position: Vec3);

    fn detach(&mut self, handle: RenderHandle);
}

/// GPU instance data, 48 bytes (3 rows of vec4).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SpriteInstance {
    /// xyz = position, w = rotation in radians
    pub pos_rotation: [f32; 4],
    /// xy = size, zw = corner offset
    pub size_offset: [f32; 4],
    /// rgba, alpha already multiplied by transparency
    pub color: [f32; 4],
}

impl SpriteInstance {
    pub fn from_desc(desc: &SpriteDesc) -> Self {
        let tint = desc.tint;
        Self {
            pos_rotation: [
                desc.position.x,
                desc.position.y,
                desc.position.z,
                desc.rotation.to_radians(),
            ],
            size_offset: [desc.size.x, desc.size.y, desc.offset.x, desc.offset.y],
            color: [tint.r, tint.g, tint.b, tint.a * desc.transparency],
        }
    }
}

/// Draw data for one sprite texture, consumed by the renderer
pub struct SpriteDrawData<'a> {
    pub sprite: &'a str,
    pub instances: &'a [SpriteInstance],
}

/// Slot-allocated sprite store that packs live sprites into one instance
/// buffer, grouped by texture and sorted back to front
#[derive(Default)]
pub struct SpriteBatch {
    slots: Vec<Option<SpriteDesc>>,
    free: Vec<u32>,
    live: usize,
    instance_buffer: Vec<SpriteInstance>,
    /// (sprite, start, count) per texture group
    instance_ranges: Vec<(String, usize, usize)>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, handle: RenderHandle) -> Option<&SpriteDesc> {
        self.slots.get(handle.0 as usize).and_then(|s| s.as_ref())
    }

    fn get_mut(&mut self, handle: RenderHandle) -> Option<&mut SpriteDesc> {
        self.slots.get_mut(handle.0 as usize).and_then(|s| s.as_mut())
    }

    /// Rebuild the instance buffer from live sprites
    pub fn pack_instances(&mut self) {
        self.instance_buffer.clear();
        self.instance_ranges.clear();

        let mut live: Vec<&SpriteDesc> = self.slots.iter().flatten().collect();
        live.sort_by(|a, b| {
            a.sprite
                .cmp(&b.sprite)
                .then(a.position.z.total_cmp(&b.position.z))
        });

        for desc in live {
            let same_group =
                matches!(self.instance_ranges.last(), Some((sprite, _, _)) if *sprite == desc.sprite);
            if same_group {
                if let Some((_, _, count)) = self.instance_ranges.last_mut() {
                    *count += 1;
                }
            } else {
                self.instance_ranges
                    .push((desc.sprite.clone(), self.instance_buffer.len(), 1));
            }
            self.instance_buffer.push(SpriteInstance::from_desc(desc));
        }
    }

    /// Get the packed instance data
    pub fn instance_data(&self) -> &[SpriteInstance] {
        &self.instance_buffer
    }

    /// Draw data per texture, valid after `pack_instances`
    pub fn draw_data(&self) -> Vec<SpriteDrawData<'_>> {
        self.instance_ranges
            .iter()
            .map(|(sprite, start, count)| SpriteDrawData {
                sprite,
                instances: &self.instance_buffer[*start..*start + *count],
            })
            .collect()
    }
}

impl SpriteRenderer for SpriteBatch {
    fn attach(&mut self, desc: &SpriteDesc) -> RenderHandle {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(desc.clone());
                RenderHandle(index)
            }
            None => {
                self.slots.push(Some(desc.clone()));
                RenderHandle((self.slots.len() - 1) as u32)
            }
        }
    }

    fn set_transparency(&mut self, handle: RenderHandle, transparency: f32) {
        if let Some(desc) = self.get_mut(handle) {
            desc.transparency = transparency;
        }
    }

    fn set_position(&mut self, handle: RenderHandle, position: Vec3) {
        if let Some(desc) = self.get_mut(handle) {
            desc.position = position;
        }
    }

    fn detach(&mut self, handle: RenderHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0 as usize) {
            if slot.take().is_some() {
                self.live -= 1;
                self.free.push(handle.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(sprite: &str, z: f32) -> SpriteDesc {
        SpriteDesc {
            sprite: sprite.to_string(),
            position: Vec3::new(0.0, 0.0, z),
            size: Vec2::new(2.0, 2.0),
            offset: Vec2::new(-1.0, -1.0),
            rotation: 180.0,
            tint: Color::new(1.0, 0.5, 0.0, 0.8),
            transparency: 1.0,
        }
    }

    #[test]
    fn sprite_instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 48);
        assert_eq!(std::mem::align_of::<SpriteInstance>(), 4);
    }

    #[test]
    fn transparency_scales_alpha() {
        let mut batch = SpriteBatch::new();
        let h = batch.attach(&desc("a.png", 0.0));
        batch.set_transparency(h, 0.5);
        batch.pack_instances();

        let instance = batch.instance_data()[0];
        assert!((instance.color[3] - 0.4).abs() < 1e-6);
        assert!((instance.pos_rotation[3] - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn detach_frees_slot_for_reuse() {
        let mut batch = SpriteBatch::new();
        let a = batch.attach(&desc("a.png", 0.0));
        let _b = batch.attach(&desc("a.png", 0.0));
        batch.detach(a);
        batch.detach(a);
        assert_eq!(batch.len(), 1);
        assert!(batch.get(a).is_none());

        let c = batch.attach(&desc("b.png", 0.0));
        assert_eq!(c, a);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn draw_data_groups_by_sprite_back_to_front() {
        let mut batch = SpriteBatch::new();
        batch.attach(&desc("smoke.png", 1.0));
        batch.attach(&desc("spark.png", 0.0));
        batch.attach(&desc("smoke.png", -1.0));
        batch.pack_instances();

        let draws = batch.draw_data();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].sprite, "smoke.png");
        assert_eq!(draws[0].instances.len(), 2);
        assert_eq!(draws[0].instances[0].pos_rotation[2], -1.0);
        assert_eq!(draws[1].sprite, "spark.png");
    }

    #[test]
    fn instances_cast_to_bytes() {
        let mut batch = SpriteBatch::new();
        batch.attach(&desc("a.png", 0.0));
        batch.pack_instances();
        let bytes: &[u8] = bytemuck::cast_slice(batch.instance_data());
        assert_eq!(bytes.len(), 48);
    }
}
