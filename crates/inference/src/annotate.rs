//! Burns detection boxes and labels into a copy of the input image.

use crate::detection::Detection;
use common::span_debug;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};

const GLYPH_SIZE: i64 = 8;

/// Box colors, cycled by class id.
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Line width scaled to the image, never thinner than 2px.
pub fn line_width(width: u32, height: u32) -> i64 {
    (((width + height) as f32 / 2.0 * 0.003).round() as i64).max(2)
}

/// Returns a copy of `image` with every detection drawn on it.
pub fn annotate(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let _s = span_debug!("annotate");

    let mut canvas = image.clone();
    let lw = line_width(image.width(), image.height());
    let text_scale = (lw / 2).max(1);

    for det in detections {
        let color = class_color(det.class_id);
        let [x1, y1, x2, y2] = det.bbox.map(|v| v.round() as i64);

        draw_box(&mut canvas, (x1, y1, x2, y2), lw, color);

        let text = format!("{} {:.2}", det.class_name, det.confidence);
        draw_label(&mut canvas, &text, x1, y1, text_scale, color);
    }

    canvas
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let x0 = x0.clamp(0, image.width() as i64);
    let x1 = x1.clamp(0, image.width() as i64);
    let y0 = y0.clamp(0, image.height() as i64);
    let y1 = y1.clamp(0, image.height() as i64);

    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_box(image: &mut RgbImage, (x1, y1, x2, y2): (i64, i64, i64, i64), lw: i64, color: Rgb<u8>) {
    // Stroke grows inward so the outline stays within the box
    fill_rect(image, x1, y1, x2, y1 + lw, color);
    fill_rect(image, x1, y2 - lw, x2, y2, color);
    fill_rect(image, x1, y1, x1 + lw, y2, color);
    fill_rect(image, x2 - lw, y1, x2, y2, color);
}

/// Draw `text` on a filled tab sitting on the box's top edge, or just inside
/// the box when there is no room above it.
fn draw_label(image: &mut RgbImage, text: &str, x: i64, box_top: i64, scale: i64, background: Rgb<u8>) {
    let padding = scale;
    let glyph = GLYPH_SIZE * scale;
    let tab_width = text.chars().count() as i64 * glyph + 2 * padding;
    let tab_height = glyph + 2 * padding;

    let tab_top = if box_top >= tab_height {
        box_top - tab_height
    } else {
        box_top.max(0)
    };

    fill_rect(image, x, tab_top, x + tab_width, tab_top + tab_height, background);

    let foreground = text_color(background);
    let mut cursor = x + padding;
    let baseline = tab_top + padding;

    for ch in text.chars() {
        let bitmap = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);

        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = cursor + col * scale;
                let py = baseline + row as i64 * scale;
                fill_rect(image, px, py, px + scale, py + scale, foreground);
            }
        }

        cursor += glyph;
    }
}

/// Black on light backgrounds, white on dark ones.
fn text_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 150.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

    fn detection(bbox: [f32; 4], class_id: u32) -> Detection {
        Detection {
            bbox,
            confidence: 0.87,
            class_id,
            class_name: "person".to_string(),
        }
    }

    #[test]
    fn test_dimensions_preserved() {
        let image = RgbImage::from_pixel(640, 480, BACKGROUND);
        let annotated = annotate(&image, &[detection([100.0, 100.0, 300.0, 400.0], 0)]);

        assert_eq!(annotated.dimensions(), (640, 480));
    }

    #[test]
    fn test_no_detections_leaves_image_untouched() {
        let image = RgbImage::from_pixel(32, 32, BACKGROUND);
        let annotated = annotate(&image, &[]);

        assert_eq!(annotated, image);
    }

    #[test]
    fn test_box_outline_uses_class_color() {
        let image = RgbImage::from_pixel(640, 480, BACKGROUND);
        let annotated = annotate(&image, &[detection([100.0, 100.0, 300.0, 400.0], 3)]);
        let color = class_color(3);

        // left and bottom edges, away from the label tab
        assert_eq!(*annotated.get_pixel(100, 250), color);
        assert_eq!(*annotated.get_pixel(200, 399), color);
        // interior untouched
        assert_eq!(*annotated.get_pixel(200, 250), BACKGROUND);
    }

    #[test]
    fn test_label_tab_drawn_above_box() {
        let image = RgbImage::from_pixel(640, 480, BACKGROUND);
        let annotated = annotate(&image, &[detection([100.0, 100.0, 300.0, 400.0], 0)]);

        // tab spans rows [100 - 10, 100) for scale 1 (8px glyph + 1px padding each side)
        let tab_pixels = (90..100)
            .flat_map(|y| (100..160).map(move |x| (x, y)))
            .filter(|&(x, y)| *annotated.get_pixel(x, y) != BACKGROUND)
            .count();
        assert!(tab_pixels > 300, "label tab missing ({} pixels)", tab_pixels);
    }

    #[test]
    fn test_boxes_outside_frame_are_clipped() {
        let image = RgbImage::from_pixel(64, 48, BACKGROUND);
        let detections = [
            detection([-50.0, -50.0, 20.0, 20.0], 1),
            detection([50.0, 40.0, 500.0, 500.0], 2),
            detection([f32::NAN, 0.0, 10.0, 10.0], 3),
        ];

        let annotated = annotate(&image, &detections);
        assert_eq!(annotated.dimensions(), (64, 48));
    }

    #[test]
    fn test_line_width_scales_with_image() {
        assert_eq!(line_width(640, 480), 2);
        assert_eq!(line_width(2000, 2000), 6);
        assert_eq!(line_width(4000, 4000), 12);
    }

    #[test]
    fn test_text_color_contrast() {
        assert_eq!(text_color(Rgb([255, 255, 255])), Rgb([0, 0, 0]));
        assert_eq!(text_color(Rgb([0, 24, 236])), Rgb([255, 255, 255]));
    }
}
