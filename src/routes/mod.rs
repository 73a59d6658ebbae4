pub mod auth;
pub mod barcodes;
pub mod companies;
pub mod company_employees;
pub mod company_operations;
pub mod employees_mapping;
pub mod health;
pub mod hourly_data;
pub mod products;
pub mod service_note;
pub mod tasks;
pub mod tsd;
pub mod uploads;
pub mod users;

use actix_web::web;

/// Routes below `/api`. Every one of them except login and logout requires
/// a bearer token.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::logout)
            .service(auth::me),
    )
    .service(
        web::scope("/users")
            .service(users::list_users)
            .service(users::create_user)
            .service(users::get_modules)
            .service(users::update_modules)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user),
    )
    .service(
        web::scope("/companies")
            .service(companies::list_companies)
            .service(companies::create_company)
            .service(companies::set_company_active),
    )
    .service(
        // `/schedule` must be registered before `/{hour}`.
        web::scope("/hourly-data")
            .service(hourly_data::get_schedule)
            .service(hourly_data::get_summary)
            .service(hourly_data::bulk_update)
            .service(hourly_data::get_hour)
            .service(hourly_data::upsert_hourly),
    )
    .service(
        web::scope("/company-operations")
            .service(company_operations::list_operations)
            .service(company_operations::add_operation)
            .service(company_operations::delete_operation),
    )
    .service(
        web::scope("/company-employees")
            .service(company_employees::list_employees)
            .service(company_employees::get_employees)
            .service(company_employees::set_employees),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::update_task_status)
            .service(tasks::update_task_photo)
            .service(tasks::delete_task),
    )
    .service(web::scope("/upload").service(uploads::upload_photo))
    .service(
        web::scope("/tsd")
            .service(tsd::check_barcode)
            .service(tsd::issue)
            .service(tsd::issue_bulk_company)
            .service(tsd::return_device)
            .service(tsd::return_bulk_company)
            .service(tsd::list_active)
            .service(tsd::history)
            .service(tsd::stats)
            .service(tsd::export)
            .service(tsd::delete_transaction),
    )
    .service(
        web::scope("/employees-mapping")
            .service(employees_mapping::get_roster)
            .service(employees_mapping::save_roster)
            .service(employees_mapping::upload_roster)
            .service(employees_mapping::upload_photo),
    )
    .service(
        web::scope("/products")
            .service(products::search_product)
            .service(products::import_products),
    )
    .service(
        web::scope("/barcodes")
            .service(barcodes::search_barcode)
            .service(barcodes::generate_barcode)
            .service(barcodes::render_barcode),
    )
    .service(web::scope("/service-note").service(service_note::generate));
}
