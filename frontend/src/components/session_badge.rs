use crate::auth::{AuthContext, logout};
use leptos::prelude::*;

/// 导航栏中的会话信息：当前用户、角色与注销按钮
#[component]
pub fn SessionBadge(auth: AuthContext) -> impl IntoView {
    let user = move || auth.state.with(|s| s.user().cloned());

    view! {
        <Show
            when=move || user().is_some()
            fallback=|| view! {
                <a href="/login" data-route="login" class="btn btn-sm btn-primary">"Sign in"</a>
            }
        >
            <div class="flex items-center gap-2">
                <span class="badge badge-neutral hidden md:inline-flex">
                    {move || user().map(|u| u.email).unwrap_or_default()}
                </span>
                <span class="badge badge-outline">
                    {move || user().map(|u| u.role).unwrap_or_default()}
                </span>
                <button class="btn btn-sm btn-outline btn-error" on:click=move |_| logout(&auth)>
                    "Sign out"
                </button>
            </div>
        </Show>
    }
}
