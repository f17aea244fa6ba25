use super::{escape, input, layout, post_button, textarea};
use crate::auth::CurrentUser;
use crate::flash::Flash;
use crate::models::document::{self, DocumentForm, DATE_FORMAT};

pub fn list_page(user: &CurrentUser, flashes: &[Flash], documents: &[document::Model]) -> String {
    let mut body = String::from("<p><a href=\"/documents/create\">Добавить</a></p>\n");
    if documents.is_empty() {
        body.push_str("<p>Записей пока нет.</p>");
        return layout("Документы", Some(user), flashes, &body);
    }

    body.push_str(
        "<table>\n<tr><th>#</th><th>ФИО</th><th>Дата рождения</th><th>Возраст</th>\
         <th>Телефон</th><th>Почта</th><th>Адрес</th><th>Создан</th><th></th></tr>\n",
    );
    for doc in documents {
        let actions = if doc.editable_by(user.id, user.role) {
            format!(
                "<a href=\"/documents/{id}/edit\">Изменить</a> {}",
                post_button(&format!("/documents/{}/delete", doc.id), "Удалить"),
                id = doc.id
            )
        } else {
            String::new()
        };
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            doc.id,
            escape(&doc.full_name),
            doc.birth_date.format(DATE_FORMAT),
            doc.age(),
            escape(&doc.phone),
            escape(doc.email.as_deref().unwrap_or("")),
            escape(doc.address.as_deref().unwrap_or("")),
            doc.created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            actions
        ));
    }
    body.push_str("</table>");
    layout("Документы", Some(user), flashes, &body)
}

/// Create and edit share one form; `action` is where it posts.
pub fn form_page(
    user: &CurrentUser,
    flashes: &[Flash],
    title: &str,
    action: &str,
    form: &DocumentForm,
) -> String {
    let body = format!(
        "<form method=\"post\" action=\"{action}\">\n{}\n{}\n{}\n{}\n{}\n{}\n\
         <button type=\"submit\">Сохранить</button> <a href=\"/documents\">Отмена</a>\n</form>",
        input("ФИО", "full_name", form.full_name.as_deref(), "text"),
        input("Дата рождения", "birth_date", form.birth_date.as_deref(), "date"),
        input("Телефон", "phone", form.phone.as_deref(), "text"),
        input("Почта", "email", form.email.as_deref(), "email"),
        textarea("Адрес", "address", form.address.as_deref()),
        textarea("Примечания", "notes", form.notes.as_deref()),
        action = escape(action),
    );
    layout(title, Some(user), flashes, &body)
}
