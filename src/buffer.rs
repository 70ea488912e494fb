use crate::{
    foundation::core::{Channel, ChannelOrder},
    foundation::error::{ChanError, ChanResult},
    identity::IdentityGraph,
};

/// A `height x width x 3` grid of 8-bit samples, stored as three planes.
///
/// Plane `i` holds whichever channel sits at index `i` of the accompanying
/// [`ChannelOrder`]. Buffers are never edited in place by core operations; every
/// operation produces a new buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, planes: [Vec<u8>; 3]) -> ChanResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| ChanError::parameter("pixel buffer size overflow"))?;
        for (i, plane) in planes.iter().enumerate() {
            if plane.len() != expected {
                return Err(ChanError::parameter(format!(
                    "plane {i} holds {} samples, expected {width}x{height}={expected}",
                    plane.len()
                )));
            }
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    pub fn filled(width: u32, height: u32, value: [u8; 3]) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            planes: value.map(|v| vec![v; len]),
        }
    }

    /// Build from interleaved RGB8 samples (as produced by the image codec).
    pub fn from_interleaved(width: u32, height: u32, rgb: &[u8]) -> ChanResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| ChanError::parameter("pixel buffer size overflow"))?;
        if rgb.len() != len {
            return Err(ChanError::parameter(format!(
                "interleaved buffer holds {} samples, expected {len}",
                rgb.len()
            )));
        }
        let mut planes: [Vec<u8>; 3] = Default::default();
        for plane in &mut planes {
            plane.reserve_exact(len / 3);
        }
        for px in rgb.chunks_exact(3) {
            for (plane, &v) in planes.iter_mut().zip(px) {
                plane.push(v);
            }
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    pub fn to_interleaved(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.sample_count() * 3);
        for i in 0..self.sample_count() {
            out.extend(self.planes.iter().map(|p| p[i]));
        }
        out
    }

    pub fn from_rgb_image(img: &image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let mut planes: [Vec<u8>; 3] = Default::default();
        for px in img.pixels() {
            for (plane, &v) in planes.iter_mut().zip(px.0.iter()) {
                plane.push(v);
            }
        }
        Self {
            width,
            height,
            planes,
        }
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let i = self.index(x, y);
            image::Rgb([self.planes[0][i], self.planes[1][i], self.planes[2][i]])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per plane.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn plane(&self, index: usize) -> &[u8] {
        &self.planes[index]
    }

    pub fn sample(&self, x: u32, y: u32, plane: usize) -> u8 {
        self.planes[plane][self.index(x, y)]
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Copy with `plane` replaced. `data` must match the current shape.
    pub fn with_plane(&self, plane: usize, data: Vec<u8>) -> ChanResult<Self> {
        if data.len() != self.sample_count() {
            return Err(ChanError::parameter(format!(
                "replacement plane holds {} samples, expected {}",
                data.len(),
                self.sample_count()
            )));
        }
        let mut out = self.clone();
        out.planes[plane] = data;
        Ok(out)
    }

    /// Symmetric zero padding of `padding` samples on every side of every plane.
    pub fn padded(&self, padding: u32) -> Self {
        if padding == 0 {
            return self.clone();
        }
        let w = self.width as usize;
        let pw = w + 2 * padding as usize;
        let ph = self.height as usize + 2 * padding as usize;
        let p = padding as usize;
        let planes = self.planes.each_ref().map(|src| {
            let mut dst = vec![0u8; pw * ph];
            for (y, row) in src.chunks_exact(w.max(1)).enumerate().take(self.height as usize) {
                let start = (y + p) * pw + p;
                dst[start..start + w].copy_from_slice(&row[..w]);
            }
            dst
        });
        Self {
            width: pw as u32,
            height: ph as u32,
            planes,
        }
    }

    /// Physically reorder planes: plane `i` of the result is plane `perm[i]` of `self`.
    pub fn permuted(&self, perm: [usize; 3]) -> Self {
        Self {
            width: self.width,
            height: self.height,
            planes: perm.map(|src| self.planes[src].clone()),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// The explicit state tuple every core operation consumes and produces.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageState {
    pub buffer: PixelBuffer,
    pub order: ChannelOrder,
    pub identity: IdentityGraph,
}

impl ImageState {
    /// Fresh state for a newly loaded image: default order, trivial identity.
    pub fn new(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            order: ChannelOrder::default(),
            identity: IdentityGraph::trivial(),
        }
    }

    /// Samples of the plane currently backing `channel`.
    pub fn channel_plane(&self, channel: Channel) -> &[u8] {
        self.buffer.plane(self.order.position(channel))
    }

    pub(crate) fn with_buffer(&self, buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            order: self.order,
            identity: self.identity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_planes() {
        let err = PixelBuffer::new(2, 2, [vec![0; 4], vec![0; 3], vec![0; 4]]).unwrap_err();
        assert!(err.to_string().contains("plane 1"));
    }

    #[test]
    fn interleaved_roundtrip_keeps_sample_positions() {
        let rgb = [1u8, 2, 3, 4, 5, 6];
        let buf = PixelBuffer::from_interleaved(2, 1, &rgb).unwrap();
        assert_eq!(buf.plane(0), &[1, 4]);
        assert_eq!(buf.plane(2), &[3, 6]);
        assert_eq!(buf.to_interleaved(), rgb);
    }

    #[test]
    fn padded_surrounds_with_zeros() {
        let buf = PixelBuffer::filled(2, 1, [9, 8, 7]);
        let out = buf.padded(1);
        assert_eq!((out.width(), out.height()), (4, 3));
        assert_eq!(out.plane(0), &[0, 0, 0, 0, 0, 9, 9, 0, 0, 0, 0, 0]);
        assert_eq!(out.sample(1, 1, 2), 7);
        assert_eq!(out.sample(0, 0, 2), 0);
    }

    #[test]
    fn permuted_moves_plane_data() {
        let buf = PixelBuffer::filled(1, 1, [1, 2, 3]);
        let out = buf.permuted([2, 0, 1]);
        assert_eq!(out.plane(0), &[3]);
        assert_eq!(out.plane(1), &[1]);
        assert_eq!(out.plane(2), &[2]);
    }

    #[test]
    fn rgb_image_conversion_matches_planes() {
        let img = image::RgbImage::from_raw(1, 2, vec![10, 20, 30, 40, 50, 60]).unwrap();
        let buf = PixelBuffer::from_rgb_image(&img);
        assert_eq!(buf.plane(1), &[20, 50]);
        assert_eq!(buf.to_rgb_image(), img);
    }
}
