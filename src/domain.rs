use std::io;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::view_state::{FilterField, PageSize, SortField};

#[derive(Debug, Error)]
pub enum TVError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("invalid json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("page size {0} is not one of 5, 10, 15")]
    InvalidPageSize(usize),
}

#[derive(Debug, Clone, Setters)]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: PageSize,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            page_size: PageSize::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    FilterContains,
    GotoPage,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::FilterContains => "Legal name contains: ",
            CMDMode::GotoPage => "Go to page: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    Sort(SortField),
    Pick(FilterField),
    FilterContains,
    GotoPage,
    ClearFilters,
    Enter,
    Exit,
    Help,
    CopyRow,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  j / Down        next row
  k / Up          previous row
  l / Right / PgDn  next page
  h / Left / PgUp   previous page
  g / Home        first page
  G / End         last page
  :               go to page

Sorting
  1               sort by created date
  2               sort by modified date
  3               sort by legal name
                  (again on the same column reverses)

Filtering
  e               pick entity type
  n               pick legal name
  d               pick DBA name
  /               legal name contains ...
  c               clear all filters
  s               cycle rows per page (5, 10, 15)

Other
  Enter           show record / apply pick
  y               copy record as csv
  Esc             back
  ?               this help
  q               quit";
