use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;

use super::clients::LIST_URL;
use crate::auth::CurrentUser;
use crate::error::{CrmError, CrmResult};
use crate::flash::{self, Flash};
use crate::legacy::import::{import_rows, read_rows, ImportFormat};
use crate::state::AppState;

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

enum Received {
    File(Upload),
    Missing,
    TooLarge,
}

/// Read the `file` field, skipping anything else in the form.
async fn receive(mut payload: Multipart, limit: usize) -> CrmResult<Received> {
    let mut upload = None;
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| CrmError::BadRequest(e.to_string()))?;
        let is_file = field.name() == Some("file");
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| CrmError::BadRequest(e.to_string()))?;
            if !is_file {
                continue;
            }
            if bytes.len() + chunk.len() > limit {
                return Ok(Received::TooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file && !filename.is_empty() {
            upload = Some(Upload { filename, bytes });
        }
    }
    Ok(upload.map(Received::File).unwrap_or(Received::Missing))
}

pub async fn import(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    payload: Multipart,
) -> CrmResult<HttpResponse> {
    let upload = match receive(payload, state.import.max_upload_bytes).await? {
        Received::File(upload) => upload,
        Received::Missing => {
            return Ok(flash::redirect(&req, LIST_URL, vec![Flash::warning("Выберите файл")]));
        }
        Received::TooLarge => {
            let message = format!(
                "Файл слишком большой (максимум {} байт)",
                state.import.max_upload_bytes
            );
            return Ok(flash::redirect(&req, LIST_URL, vec![Flash::warning(message)]));
        }
    };

    let Some(format) = ImportFormat::from_filename(&upload.filename) else {
        return Ok(flash::redirect(
            &req,
            LIST_URL,
            vec![Flash::warning("Поддерживаются только файлы .csv и .xlsx")],
        ));
    };

    log::info!(
        "User {} is importing {} ({} bytes)",
        user.username,
        upload.filename,
        upload.bytes.len()
    );
    let rows = match read_rows(format, &upload.bytes, state.import.max_rows) {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Import of {} rejected: {}", upload.filename, e);
            return Ok(flash::redirect(&req, LIST_URL, vec![Flash::warning(e.to_string())]));
        }
    };

    let summary = import_rows(&state.db, &state.people, rows).await;
    Ok(flash::redirect(&req, LIST_URL, vec![summary.to_flash()]))
}
