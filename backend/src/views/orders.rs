use super::{escape, input, layout, path_segment, post_button};
use crate::auth::CurrentUser;
use crate::flash::Flash;
use crate::legacy::orders::{OrderForm, OrderRow};
use crate::legacy::people::PersonRow;
use crate::legacy::schema::OrdersSchema;
use crate::views::clients::person_url;

pub fn order_url(person: &PersonRow, key: &str) -> String {
    format!("{}/orders/{}", person_url(person), path_segment(key))
}

pub fn list_page(
    user: &CurrentUser,
    flashes: &[Flash],
    person: &PersonRow,
    schema: &OrdersSchema,
    orders: &[OrderRow],
) -> String {
    let base = person_url(person);
    let mut body = format!(
        "<p>Клиент: <a href=\"{base}\">{}</a>, телефон {}</p>\n\
         <p><a href=\"{base}/orders/create\">Новый заказ</a></p>\n",
        escape(person.display_name()),
        escape(person.phone()),
        base = base,
    );
    if orders.is_empty() {
        body.push_str("<p>Заказов нет.</p>");
        return layout("Заказы", Some(user), flashes, &body);
    }

    body.push_str("<table>\n<tr><th>№</th>");
    for column in schema.column_names() {
        body.push_str(&format!("<th>{}</th>", escape(column)));
    }
    body.push_str("<th></th></tr>\n");
    for order in orders {
        body.push_str(&format!("<tr><td>{}</td>", order.ordinal));
        for (_, value) in &order.values {
            body.push_str(&format!("<td>{}</td>", escape(value.as_deref().unwrap_or(""))));
        }
        let url = order_url(person, &order.key);
        body.push_str(&format!(
            "<td><a href=\"{}/edit\">Изменить</a> {}</td></tr>\n",
            url,
            post_button(&format!("{}/delete", url), "Удалить")
        ));
    }
    body.push_str("</table>");
    layout("Заказы", Some(user), flashes, &body)
}

/// Form over the business columns only.
pub fn form_page(
    user: &CurrentUser,
    flashes: &[Flash],
    person: &PersonRow,
    schema: &OrdersSchema,
    title: &str,
    action: &str,
    values: &OrderForm,
) -> String {
    let fields: Vec<String> = schema
        .business_columns
        .iter()
        .map(|column| input(column, column, values.get(column).map(String::as_str), "text"))
        .collect();
    let body = format!(
        "<p>Клиент: {}</p>\n<form method=\"post\" action=\"{}\">\n{}\n\
         <button type=\"submit\">Сохранить</button> <a href=\"{}/orders\">Отмена</a>\n</form>",
        escape(person.display_name()),
        escape(action),
        fields.join("\n"),
        person_url(person),
    );
    layout(title, Some(user), flashes, &body)
}

/// Current values of `order` as a pre-filled form.
pub fn form_values(schema: &OrdersSchema, order: &OrderRow) -> OrderForm {
    schema
        .business_columns
        .iter()
        .map(|column| (column.clone(), order.get(column).unwrap_or("").to_string()))
        .collect()
}
