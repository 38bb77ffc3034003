pub(crate) mod compositor;
pub(crate) mod ffmpeg;
pub(crate) mod sink;
