use super::{input, layout};
use crate::auth::CurrentUser;
use crate::flash::Flash;

pub fn login_page(flashes: &[Flash], username: Option<&str>) -> String {
    let body = format!(
        "<form method=\"post\" action=\"/login\">\n{}\n{}\n<button type=\"submit\">Войти</button>\n</form>",
        input("Логин", "username", username, "text"),
        input("Пароль", "password", None, "password"),
    );
    layout("Вход", None, flashes, &body)
}

pub fn change_password_page(user: &CurrentUser, flashes: &[Flash]) -> String {
    let body = format!(
        "<form method=\"post\" action=\"/change-password\">\n{}\n{}\n{}\n<button type=\"submit\">Сохранить</button>\n</form>",
        input("Текущий пароль", "current_password", None, "password"),
        input("Новый пароль", "new_password", None, "password"),
        input("Повторите пароль", "new_password2", None, "password"),
    );
    layout("Смена пароля", Some(user), flashes, &body)
}
