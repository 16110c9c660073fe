use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{chats, lists, messages};

/// Every route the service exposes. Everything outside `/auth` needs a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/account", get(auth::profile).delete(auth::delete_account))
        .route("/account/status", put(auth::set_status))
        .route("/lists/{kind}", get(lists::get_list).post(lists::add_to_list))
        .route("/lists/{kind}/{login}", delete(lists::remove_from_list))
        .route("/chats", get(chats::list_chats).post(chats::create_chat))
        .route("/chats/administered", get(chats::administered_chats))
        .route("/chats/{chat_id}", delete(chats::delete_chat))
        .route(
            "/chats/{chat_id}/members",
            get(chats::list_members).post(chats::add_member),
        )
        .route("/chats/{chat_id}/members/{login}", delete(chats::remove_member))
        .route(
            "/chats/{chat_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/messages/{message_id}",
            patch(messages::edit_message).delete(messages::delete_message),
        )
        .route("/notifications", get(messages::notifications))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public_routes.merge(protected_routes).with_state(state)
}
