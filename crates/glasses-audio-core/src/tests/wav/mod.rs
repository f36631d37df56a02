mod format;
mod reader;
