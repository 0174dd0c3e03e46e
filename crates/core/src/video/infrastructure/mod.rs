pub mod ffmpeg_writer;
pub mod live_view_sink;
pub mod sink_factory;
pub mod snapshot_writer;
