use super::{escape, input, layout, post_button, textarea};
use crate::auth::CurrentUser;
use crate::flash::Flash;
use crate::legacy::people::{PersonForm, PersonRow, SearchParams};

pub fn person_url(person: &PersonRow) -> String {
    format!("/clients/{}", person.id)
}

fn cell(value: &Option<String>) -> String {
    format!("<td>{}</td>", escape(value.as_deref().unwrap_or("")))
}

fn search_form(params: &SearchParams) -> String {
    format!(
        "<form method=\"get\" action=\"/clients/\">\n{}\n{}\n{}\n{}\n{}\n\
         <button type=\"submit\">Найти</button> <a href=\"/clients/\">Сбросить</a>\n</form>",
        input("ФИО", "fio", params.fio.as_deref(), "text"),
        input("Телефон", "phone", params.phone.as_deref(), "text"),
        input("Почта", "email", params.email.as_deref(), "text"),
        input("Возраст", "age", params.age.as_deref(), "text"),
        input("Пол", "gender", params.gender.as_deref(), "text"),
    )
}

const IMPORT_FORM: &str = "<form method=\"post\" action=\"/clients/import\" enctype=\"multipart/form-data\">\n\
    <label>Импорт (.csv, .xlsx) <input type=\"file\" name=\"file\" accept=\".csv,.xlsx\"></label>\n\
    <button type=\"submit\">Загрузить</button>\n</form>";

pub fn list_page(
    user: &CurrentUser,
    flashes: &[Flash],
    params: &SearchParams,
    people: &[PersonRow],
) -> String {
    let mut body = format!(
        "{}\n{}\n<p><a href=\"/clients/create\">Добавить клиента</a> Найдено: {}</p>\n",
        search_form(params),
        IMPORT_FORM,
        people.len()
    );
    body.push_str(
        "<table>\n<tr><th>ФИО</th><th>Пол</th><th>Адрес</th><th>Возраст</th><th>Дата рождения</th>\
         <th>Телефон</th><th>Почта</th><th>Примечания</th><th></th></tr>\n",
    );
    for person in people {
        let url = person_url(person);
        body.push_str(&format!(
            "<tr><td><a href=\"{url}\">{}</a></td>{}{}{}{}{}{}{}<td><a href=\"{url}/orders\">Заказы</a> \
             <a href=\"{url}/edit\">Изменить</a> {}</td></tr>\n",
            escape(person.display_name()),
            cell(&person.gender),
            cell(&person.address),
            cell(&person.age),
            cell(&person.birth_date),
            cell(&person.phone),
            cell(&person.email),
            cell(&person.notes),
            post_button(&format!("{}/delete", url), "Удалить"),
            url = url,
        ));
    }
    body.push_str("</table>");
    layout("Клиенты", Some(user), flashes, &body)
}

pub fn form_page(
    user: &CurrentUser,
    flashes: &[Flash],
    title: &str,
    action: &str,
    form: &PersonForm,
) -> String {
    let body = format!(
        "<form method=\"post\" action=\"{action}\">\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n\
         <button type=\"submit\">Сохранить</button> <a href=\"/clients/\">Отмена</a>\n</form>",
        input("ФИО", "fio", form.fio.as_deref(), "text"),
        input("Пол", "gender", form.gender.as_deref(), "text"),
        input("Адрес", "address", form.address.as_deref(), "text"),
        input("Возраст", "age", form.age.as_deref(), "text"),
        input("Дата рождения", "birth_date", form.birth_date.as_deref(), "text"),
        input("Телефон", "phone", form.phone.as_deref(), "text"),
        input("Почта", "email", form.email.as_deref(), "text"),
        textarea("Примечания", "notes", form.notes.as_deref()),
        action = escape(action),
    );
    layout(title, Some(user), flashes, &body)
}

pub fn view_page(user: &CurrentUser, flashes: &[Flash], person: &PersonRow) -> String {
    let url = person_url(person);
    let rows: String = [
        ("Пол", &person.gender),
        ("Адрес", &person.address),
        ("Возраст", &person.age),
        ("Дата рождения", &person.birth_date),
        ("Телефон", &person.phone),
        ("Почта", &person.email),
        ("Примечания", &person.notes),
    ]
    .iter()
    .map(|(label, value)| format!("<tr><th>{}</th>{}</tr>\n", label, cell(value)))
    .collect();
    let body = format!(
        "<table>\n{rows}</table>\n<p><a href=\"{url}/orders\">Заказы</a> <a href=\"{url}/edit\">Изменить</a> {}\n\
         <a href=\"/clients/\">К списку</a></p>",
        post_button(&format!("{}/delete", url), "Удалить"),
        rows = rows,
        url = url,
    );
    layout(person.display_name(), Some(user), flashes, &body)
}

