//! In-memory archive builders for integration tests.
#![allow(dead_code)]

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::Crc;
use flate2::write::{DeflateEncoder, GzEncoder};

const BLOCK: usize = 512;

/// Builds a gzip-compressed ustar archive.
#[derive(Default)]
pub struct TarBuilder {
    buf: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regular file.
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.entry(name, b'0', data)
    }

    pub fn dir(self, name: &str) -> Self {
        self.entry(name, b'5', &[])
    }

    /// Member with an arbitrary type flag. Names longer than 100 bytes are
    /// split into the ustar prefix field.
    pub fn entry(mut self, name: &str, type_flag: u8, data: &[u8]) -> Self {
        let mut header = [0u8; BLOCK];
        let (prefix, name) = if name.len() > 100 {
            let split = name.rfind('/').expect("long names need a directory");
            (&name[..split], &name[split + 1..])
        } else {
            ("", name)
        };

        header[..name.len()].copy_from_slice(name.as_bytes());
        header[100..108].copy_from_slice(b"0000644\0");
        header[108..116].copy_from_slice(b"0000000\0");
        header[116..124].copy_from_slice(b"0000000\0");
        header[124..136].copy_from_slice(format!("{:011o}\0", data.len()).as_bytes());
        header[136..148].copy_from_slice(b"00000000000\0");
        header[156] = type_flag;
        header[257..263].copy_from_slice(b"ustar\0");
        header[263..265].copy_from_slice(b"00");
        header[345..345 + prefix.len()].copy_from_slice(prefix.as_bytes());

        header[148..156].copy_from_slice(b"        ");
        let checksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
        header[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());

        self.buf.extend_from_slice(&header);
        self.buf.extend_from_slice(data);
        let padding = (BLOCK - data.len() % BLOCK) % BLOCK;
        self.buf.extend(std::iter::repeat_n(0u8, padding));
        self
    }

    /// Uncompressed tar bytes, terminated by two zero blocks.
    pub fn tar(&self) -> Vec<u8> {
        let mut tar = self.buf.clone();
        tar.extend_from_slice(&[0u8; BLOCK * 2]);
        tar
    }

    pub fn finish(self) -> Vec<u8> {
        gzip(&self.tar())
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

/// One member as it will be written, with every header field explicit so
/// tests can lie about sizes, checksums and flags.
pub struct ZipMember {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub crc32: u32,
    pub uncompressed_size: u32,
    pub payload: Vec<u8>,
}

/// Builds a zip archive: local headers and data, central directory, EOCD.
#[derive(Default)]
pub struct ZipBuilder {
    members: Vec<ZipMember>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// DEFLATE-compressed file.
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.member(ZipMember {
            name: name.to_string(),
            method: 8,
            flags: 0,
            crc32: crc32(data),
            uncompressed_size: data.len() as u32,
            payload: deflate(data),
        })
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.member(ZipMember {
            name: name.to_string(),
            method: 0,
            flags: 0,
            crc32: crc32(data),
            uncompressed_size: data.len() as u32,
            payload: data.to_vec(),
        })
    }

    pub fn dir(self, name: &str) -> Self {
        self.stored(name, &[])
    }

    pub fn member(mut self, member: ZipMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.members.len());

        for m in &self.members {
            offsets.push(out.len() as u32);
            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(m.flags).unwrap();
            out.write_u16::<LittleEndian>(m.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x21).unwrap();
            out.write_u32::<LittleEndian>(m.crc32).unwrap();
            out.write_u32::<LittleEndian>(m.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(m.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.extend_from_slice(m.name.as_bytes());
            out.extend_from_slice(&m.payload);
        }

        let cd_offset = out.len() as u32;
        for (m, offset) in self.members.iter().zip(&offsets) {
            out.extend_from_slice(b"PK\x01\x02");
            out.write_u16::<LittleEndian>(0x031e).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(m.flags).unwrap();
            out.write_u16::<LittleEndian>(m.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x21).unwrap();
            out.write_u32::<LittleEndian>(m.crc32).unwrap();
            out.write_u32::<LittleEndian>(m.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(m.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0o100644 << 16).unwrap();
            out.write_u32::<LittleEndian>(*offset).unwrap();
            out.extend_from_slice(m.name.as_bytes());
        }
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.members.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.members.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out
    }
}
