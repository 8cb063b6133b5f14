use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::auth::register,
        crate::rest::auth::login,
        crate::rest::auth::logout,
        crate::rest::auth::me,
        crate::rest::messages::send_message,
        crate::rest::messages::list_conversations,
        crate::rest::messages::unread_count,
        crate::rest::messages::get_conversation,
        crate::rest::messages::mark_read,
        crate::rest::messages::delete_message,
        crate::rest::groups::list_groups,
        crate::rest::groups::create_group,
        crate::rest::groups::get_group,
        crate::rest::groups::delete_group,
        crate::rest::groups::list_members,
        crate::rest::groups::add_members,
        crate::rest::groups::update_member_role,
        crate::rest::groups::remove_member,
        crate::rest::groups::leave_group,
        crate::rest::groups::list_messages,
        crate::rest::groups::send_message,
        crate::rest::vault::list_files,
        crate::rest::vault::register_file,
        crate::rest::vault::delete_file,
        crate::rest::vault::share_file,
        crate::rest::vault::incoming_shares,
        crate::rest::vault::outgoing_shares,
        crate::rest::vault::respond_to_share,
        crate::rest::notifications::get_notifications,
        crate::rest::notifications::get_unread_count,
        crate::rest::notifications::mark_notification_read,
        crate::rest::notifications::mark_all_read,
        crate::rest::notifications::delete_notification,
        crate::rest::code::list_sessions,
        crate::rest::code::create_session,
        crate::rest::code::get_session,
        crate::rest::code::update_session,
        crate::rest::code::delete_session,
        crate::rest::code::join_session,
        crate::rest::events::upcoming_events,
        crate::rest::admin::stats,
        crate::rest::admin::list_users,
        crate::rest::admin::set_role,
        crate::rest::admin::delete_user,
        crate::rest::admin::list_settings,
        crate::rest::admin::put_setting,
        crate::rest::admin::delete_setting,
        crate::rest::admin::list_events,
        crate::rest::admin::create_event,
        crate::rest::admin::update_event,
        crate::rest::admin::delete_event,
        crate::rest::admin::clear_suggestion_cache,
        crate::rest::suggestions::suggest,
        crate::rest::suggestions::stats,
        crate::rest::suggestions::suggest_ai,
        crate::rest::suggestions::improve,
        crate::rest::gemini::chat,
        crate::rest::gemini::status
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::auth::RegisterRequest,
            crate::rest::auth::LoginRequest,
            crate::rest::auth::SessionResponse,
            crate::rest::auth::SuccessResponse,
            crate::rest::messages::CountResponse,
            crate::rest::groups::AddMembersRequest,
            crate::rest::groups::UpdateRoleRequest,
            crate::rest::vault::RespondToShareRequest,
            crate::rest::notifications::NotificationsResponse,
            crate::rest::notifications::UpdatedResponse,
            crate::rest::code::UpdateCodeRequest,
            crate::rest::admin::SetRoleRequest,
            crate::rest::admin::PutSettingRequest,
            crate::rest::admin::CacheClearedResponse,
            crate::rest::suggestions::ImproveRequest,
            crate::rest::gemini::GeminiChatRequest,
            crate::rest::gemini::GeminiChatResponse,
            crate::rest::gemini::GeminiStatusResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Messages", description = "Direct messages and conversations"),
        (name = "Groups", description = "Group chats, membership and roles"),
        (name = "Vault", description = "Zoro file vault and file sharing"),
        (name = "Notifications", description = "User notifications"),
        (name = "Code", description = "Shared code sessions"),
        (name = "Events", description = "Team events"),
        (name = "Admin", description = "Site administration"),
        (name = "Suggestions", description = "Reply suggestions and message rewriting"),
        (name = "Gemini", description = "AI assistant chat")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Session token".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
