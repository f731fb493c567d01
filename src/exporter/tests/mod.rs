use super::test_helpers::*;
use super::*;
use crate::error::ExportError;
use crate::types::{Event, ExportHandle, FileId, Folder, FolderId, FolderMap, Scan, ScanId};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
