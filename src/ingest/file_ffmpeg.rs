//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in-memory and scaled to packed BGR24, the channel order
//! capture stacks conventionally deliver. End of file drains the decoder and
//! then reports a clean end of stream.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::FileConfig;
use super::StreamStats;
use crate::frame::{PixelFormat, RawFrame};

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("{} has no video track", config.path))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::BGR24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (ffmpeg)", self.config.path);
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder at end of file")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.input
            .seek(0, ..)
            .with_context(|| format!("seek {} to start", self.config.path))?;
        self.decoder.flush();
        self.eof_sent = false;
        self.frame_count = 0;
        Ok(())
    }

    pub(crate) fn stats(&self) -> StreamStats {
        StreamStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RawFrame> {
        let mut bgr_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut bgr_frame)
            .context("scale frame to BGR")?;
        let (pixels, width, height) = frame_to_pixels(&bgr_frame)?;
        self.frame_count += 1;
        Ok(RawFrame::new(pixels, width, height, PixelFormat::Bgr24))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
