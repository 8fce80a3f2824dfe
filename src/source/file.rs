//! Local file source

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{ByteSource, RawChunk, SourcePoll};
use crate::error::SourceError;
use crate::mjpeg::container::{self, VideoInfo};

/// Sequential reader over an MJPEG file, optionally looping
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
    looping: bool,
    finished: bool,
    loops: u64,
    info: Option<VideoInfo>,
}

impl FileSource {
    /// Open a video file and sniff its MJPG header if present
    pub fn open(path: impl AsRef<Path>, looping: bool) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| SourceError::Open {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(open_err)?;
        let mut header = Vec::with_capacity(container::HEADER_LEN);
        (&mut file)
            .take(container::HEADER_LEN as u64)
            .read_to_end(&mut header)
            .map_err(open_err)?;
        file.seek(SeekFrom::Start(0)).map_err(open_err)?;

        let info = VideoInfo::parse(&header);
        match info {
            Some(info) => info!(
                "Video loaded: {}x{}, {} frames, {} FPS ({})",
                info.width,
                info.height,
                info.frame_count,
                info.fps,
                path.display()
            ),
            None => info!("Opened raw MJPEG stream: {}", path.display()),
        }

        Ok(Self {
            path,
            file: Some(file),
            looping,
            finished: false,
            loops: 0,
            info,
        })
    }

    /// Number of times the file wrapped around
    pub fn loops(&self) -> u64 {
        self.loops
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn poll(&mut self, chunk: &mut RawChunk) -> Result<SourcePoll, SourceError> {
        chunk.clear();
        let Some(file) = self.file.as_mut() else {
            return Err(SourceError::Closed);
        };
        if self.finished {
            return Ok(SourcePoll::EndOfStream);
        }

        loop {
            match file.read(chunk.space_mut()) {
                Ok(0) => {
                    if self.looping {
                        file.seek(SeekFrom::Start(0)).map_err(|source| SourceError::Read {
                            origin: self.path.display().to_string(),
                            source,
                        })?;
                        self.loops += 1;
                        debug!("End of video, restarting ({} loops)", self.loops);
                    } else {
                        self.finished = true;
                        info!("End of video: {}", self.path.display());
                    }
                    return Ok(SourcePoll::EndOfStream);
                }
                Ok(n) => {
                    chunk.set_filled(n);
                    return Ok(SourcePoll::Data(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(SourceError::Read {
                        origin: self.path.display().to_string(),
                        source,
                    })
                }
            }
        }
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("Closed {}", self.path.display());
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn video_info(&self) -> Option<VideoInfo> {
        self.info
    }

    fn is_exhausted(&self) -> bool {
        self.finished
    }
}
