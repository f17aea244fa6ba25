use actix_web::{web, HttpRequest, HttpResponse};

use super::clients::find_person;
use crate::auth::CurrentUser;
use crate::error::CrmResult;
use crate::flash::{self, Flash};
use crate::legacy::orders::{self, OrderForm, OrdersOutcome};
use crate::legacy::people::PersonRow;
use crate::legacy::{error_text, execute_in_transaction};
use crate::state::AppState;
use crate::views;
use crate::views::clients::person_url;
use crate::views::orders::order_url;

fn list_url(person: &PersonRow) -> String {
    format!("{}/orders", person_url(person))
}

/// Unknown keys and orders of other clients look the same.
fn not_found(req: &HttpRequest, target: &str) -> HttpResponse {
    flash::redirect(req, target, vec![Flash::warning("Заказ не найден")])
}

pub async fn list(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let outcome = orders::list_for_person(&state.db, &state.orders, &person).await;
    let extra = match &outcome {
        OrdersOutcome::Rows(_) => Vec::new(),
        OrdersOutcome::Failed(reason) => {
            vec![Flash::warning(format!("Не удалось загрузить заказы: {}", reason))]
        }
    };
    Ok(views::ok(&req, extra, |flashes| {
        views::orders::list_page(&user, flashes, &person, &state.orders, outcome.rows())
    }))
}

pub async fn create_form(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let action = format!("{}/create", list_url(&person));
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::orders::form_page(
            &user,
            flashes,
            &person,
            &state.orders,
            "Новый заказ",
            &action,
            &OrderForm::new(),
        )
    }))
}

pub async fn create(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<OrderForm>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let target = list_url(&person);

    Ok(match orders::create(&state.db, &state.orders, &person, &form).await {
        Ok(()) => {
            log::info!("User {} added an order for person {}", user.username, person.id);
            flash::redirect(&req, &target, vec![Flash::success("Заказ добавлен")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Adding an order for person {} failed: {}", person.id, reason);
            flash::redirect(&req, &target, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    })
}

pub async fn edit_form(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> CrmResult<HttpResponse> {
    let (key, order_key) = path.into_inner();
    let person = match find_person(&req, &state, &key).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let Some(order) = orders::find_by_key(&state.db, &state.orders, &person, &order_key).await? else {
        return Ok(not_found(&req, &list_url(&person)));
    };

    let action = format!("{}/edit", order_url(&person, &order.key));
    let values = views::orders::form_values(&state.orders, &order);
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::orders::form_page(
            &user,
            flashes,
            &person,
            &state.orders,
            "Редактирование заказа",
            &action,
            &values,
        )
    }))
}

pub async fn edit(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    form: web::Form<OrderForm>,
) -> CrmResult<HttpResponse> {
    let (key, order_key) = path.into_inner();
    let person = match find_person(&req, &state, &key).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let target = list_url(&person);

    let Some(stmt) = orders::update_statement(&state.orders, &person, &order_key, &form) else {
        return Ok(not_found(&req, &target));
    };
    Ok(match execute_in_transaction(&state.db, stmt).await {
        Ok(0) => not_found(&req, &target),
        Ok(_) => {
            log::info!("User {} updated order {}", user.username, order_key);
            flash::redirect(&req, &target, vec![Flash::success("Заказ обновлён")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Updating order {} failed: {}", order_key, reason);
            flash::redirect(&req, &target, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    })
}

pub async fn delete(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> CrmResult<HttpResponse> {
    let (key, order_key) = path.into_inner();
    let person = match find_person(&req, &state, &key).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let target = list_url(&person);

    let Some(stmt) = orders::delete_statement(&state.orders, &person, &order_key) else {
        return Ok(not_found(&req, &target));
    };
    Ok(match execute_in_transaction(&state.db, stmt).await {
        Ok(0) => not_found(&req, &target),
        Ok(_) => {
            log::info!("User {} deleted order {}", user.username, order_key);
            flash::redirect(&req, &target, vec![Flash::success("Заказ удалён")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Deleting order {} failed: {}", order_key, reason);
            flash::redirect(&req, &target, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    })
}
