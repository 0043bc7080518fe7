use lazypsd::codec::{self, DecodeParams};
use lazypsd::psd::{BlendMode, ColorMode};
use lazypsd::{Compression, Psd, PsdVersion};
use std::io::{Cursor, Seek, SeekFrom};

/// Builds a complete 2x2 RGB document with one layer. Layer channels are
/// stored raw, the precomposed image is PackBits-compressed.
fn build_document() -> Vec<u8> {
    let mut bytes = vec![];

    // header
    bytes.extend_from_slice(b"8BPS");
    bytes.extend_from_slice(&1i16.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 6]);
    bytes.extend_from_slice(&3i16.to_be_bytes()); // channels
    bytes.extend_from_slice(&2i32.to_be_bytes()); // height
    bytes.extend_from_slice(&2i32.to_be_bytes()); // width
    bytes.extend_from_slice(&8i16.to_be_bytes()); // depth
    bytes.extend_from_slice(&3i16.to_be_bytes()); // RGB

    // color mode data: RGB carries none
    bytes.extend_from_slice(&0i32.to_be_bytes());

    // image resources: a single opaque block
    let mut resource = vec![];
    resource.extend_from_slice(b"8BIM");
    resource.extend_from_slice(&1005u16.to_be_bytes());
    resource.extend_from_slice(&[0, 0]); // empty name plus padding
    resource.extend_from_slice(&4i32.to_be_bytes());
    resource.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    bytes.extend_from_slice(&(resource.len() as i32).to_be_bytes());
    bytes.extend_from_slice(&resource);

    // layer record
    let mut record = vec![];
    for edge in [0i32, 0, 2, 2] {
        record.extend_from_slice(&edge.to_be_bytes());
    }
    record.extend_from_slice(&3u16.to_be_bytes());
    for id in [0i16, 1, 2] {
        record.extend_from_slice(&id.to_be_bytes());
        record.extend_from_slice(&6i32.to_be_bytes()); // tag + 4 pixel bytes
    }
    record.extend_from_slice(b"8BIM");
    record.extend_from_slice(b"norm");
    record.push(255); // opacity
    record.push(0); // clipping
    record.push(0); // flags
    record.push(0); // filler
    let mut extra = vec![];
    extra.extend_from_slice(&0i32.to_be_bytes()); // no layer mask
    extra.extend_from_slice(&0i32.to_be_bytes()); // no blending ranges
    extra.extend_from_slice(&[1, b'a', 0, 0]); // name "a" rounded to 4
    record.extend_from_slice(&(extra.len() as i32).to_be_bytes());
    record.extend_from_slice(&extra);

    // layer info: count, record, per-channel data
    let mut layer_info = vec![];
    layer_info.extend_from_slice(&1i16.to_be_bytes());
    layer_info.extend_from_slice(&record);
    for value in [0x10u8, 0x20, 0x30] {
        layer_info.extend_from_slice(&0i16.to_be_bytes()); // raw
        layer_info.extend_from_slice(&[value; 4]);
    }

    // layer and mask section: layer info, global mask, one additional block
    let mut section = vec![];
    section.extend_from_slice(&(layer_info.len() as i32).to_be_bytes());
    section.extend_from_slice(&layer_info);
    section.extend_from_slice(&0i32.to_be_bytes()); // no global mask
    section.extend_from_slice(b"8BIM");
    section.extend_from_slice(b"Patt");
    section.extend_from_slice(&2i32.to_be_bytes());
    section.extend_from_slice(&[0x01, 0x02, 0, 0]); // payload rounded to 4
    bytes.extend_from_slice(&(section.len() as i32).to_be_bytes());
    bytes.extend_from_slice(&section);

    // precomposed image: PackBits, one scanline per channel row
    bytes.extend_from_slice(&1i16.to_be_bytes());
    for _ in 0..6 {
        bytes.extend_from_slice(&2u16.to_be_bytes());
    }
    for scanline in 0..6u8 {
        bytes.extend_from_slice(&[0xFF, scanline]); // 2x scanline index
    }

    bytes
}

#[test]
fn parses_full_document() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut stream = Cursor::new(build_document());
    let psd = Psd::read(&mut stream).unwrap();

    assert_eq!(psd.version, PsdVersion::Psd);
    assert_eq!(psd.channel_count, 3);
    assert_eq!((psd.width, psd.height), (2, 2));
    assert_eq!(psd.depth, 8);
    assert_eq!(psd.color_mode, ColorMode::Rgb);
    assert!(psd.color_mode_data.is_empty());

    assert_eq!(psd.image_resources.len(), 1);
    assert_eq!(psd.image_resources[0].id, 1005);
    assert_eq!(psd.image_resources[0].data, vec![0xDE, 0xAD, 0xBE, 0xEF]);

    assert_eq!(psd.layers.len(), 1);
    let layer = &psd.layers[0];
    assert_eq!(layer.name, "a");
    assert_eq!(layer.blend_mode, BlendMode::Normal);
    assert_eq!(layer.opacity, 255);
    assert_eq!((layer.bottom, layer.right), (2, 2));
    assert_eq!(layer.channels.len(), 3);
    for channel in &layer.channels {
        assert_eq!(channel.data.compression, Compression::Raw);
        assert_eq!(channel.data.data_length, 4);
    }

    assert!(psd.global_layer_mask.is_none());
    assert!(!psd.merged_alpha_is_transparency);
    assert_eq!(psd.additional_info.len(), 1);
    assert_eq!(psd.additional_info[0].key, "Patt");
    assert_eq!(psd.additional_info[0].data, vec![0x01, 0x02]);

    assert_eq!(psd.precomposed_image.compression, Compression::PackBits);
}

#[test]
fn decodes_layer_channel_from_placeholder() {
    let mut stream = Cursor::new(build_document());
    let psd = Psd::read(&mut stream).unwrap();

    for (i, channel) in psd.layers[0].channels.iter().enumerate() {
        let placeholder = &channel.data;
        stream
            .seek(SeekFrom::Start(placeholder.offset))
            .unwrap();
        let mut pixels = vec![];
        codec::decode(
            &mut stream,
            &mut pixels,
            placeholder.compression,
            DecodeParams::Raw {
                length: Some(placeholder.data_length),
            },
            None,
        )
        .unwrap();
        let expected = (0x10 * (i as u8 + 1)) as u8;
        assert_eq!(pixels, vec![expected; 4]);
    }
}

#[test]
fn decodes_precomposed_image_from_placeholder() {
    let mut stream = Cursor::new(build_document());
    let psd = Psd::read(&mut stream).unwrap();

    let placeholder = psd.precomposed_image;
    stream.seek(SeekFrom::Start(placeholder.offset)).unwrap();
    let scanline_count = psd.channel_count as usize * psd.height as usize;
    let mut pixels = vec![];
    codec::decode(
        &mut stream,
        &mut pixels,
        placeholder.compression,
        DecodeParams::PackBits {
            scanline_count,
            wide_lengths: false,
        },
        None,
    )
    .unwrap();
    assert_eq!(pixels, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
}
