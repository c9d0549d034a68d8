//! Prompt templates, one function per generation purpose.
//!
//! Templates are plain functions over typed parameters; a missing variable
//! is a compile error, not a runtime lookup failure.

/// Grounded answer over retrieved FAQ context.
pub fn faq_response(context: &str, conversation_history: &str, user_question: &str) -> String {
    format!(
        "You are a helpful customer support assistant. Your role is to provide accurate, \
helpful, and specific information to customers based on the provided FAQ knowledge base.

Context from FAQ knowledge base:
{context}

Conversation history:
{conversation_history}

User question: {user_question}

Instructions:
1. Use the provided FAQ context to answer the user's question
2. Be specific and actionable in your response
3. If the context doesn't fully answer the question, acknowledge this and provide the best available information
4. Maintain a helpful and professional tone
5. If multiple FAQ items are relevant, synthesize them into a comprehensive answer

Please provide a helpful response:"
    )
}

/// General answer when the knowledge base has no good match.
pub fn general_response(conversation_history: &str, user_question: &str) -> String {
    format!(
        "You are a helpful customer support assistant. The user has asked a question that \
may not be fully covered in our specific knowledge base.

Conversation history:
{conversation_history}

User question: {user_question}

Instructions:
1. Provide a helpful, general answer based on your knowledge
2. Be honest about limitations if the question requires specific internal information
3. Suggest appropriate next steps when possible
4. If the question is too specific to our business or requires access to internal systems, respond with 'ESCALATE_TO_HUMAN'
5. Maintain a professional and helpful tone

Please provide a helpful response:"
    )
}

/// Concise summary of a whole conversation.
pub fn conversation_summary(conversation_text: &str) -> String {
    format!(
        "Please provide a concise summary of this customer support conversation. Focus on \
the main issues discussed, questions asked, and solutions provided.

Conversation:
{conversation_text}

Instructions:
1. Identify the main customer issue or question
2. Summarize the key points discussed
3. Note any solutions or recommendations provided
4. Keep the summary under 200 words
5. Use clear, professional language

Summary:"
    )
}

/// Short topic classification of a user question.
pub fn topic_analysis(user_question: &str) -> String {
    format!(
        "Analyze this user question and identify the main topic/domain: '{user_question}'

Identify the key topic (e.g., 'account management', 'password reset', 'billing', 'technical support', etc.)

Respond with just the main topic in 2-3 words."
    )
}

/// Follow-up question generation for the suggester.
pub fn action_suggestions(
    user_question: &str,
    main_topic: &str,
    conversation_context: &str,
    faq_context: &str,
) -> String {
    format!(
        "Based on the user's question and conversation context, generate contextually \
relevant follow-up questions and actions.

User question: {user_question}
Main topic: {main_topic}
Conversation context: {conversation_context}
Available FAQ context: {faq_context}

Instructions:
Generate 4-5 contextually relevant follow-up questions and actions that a customer would likely ask next about this specific topic. Focus on:
- Natural follow-up questions related to their specific issue
- Alternative approaches to solve their problem
- Related concerns they might have
- Next steps they might need to take
- Additional information they might need

Make the suggestions sound like natural questions a real customer would ask. Format as complete questions or actionable statements.

Examples for different topics:
- Account issues: 'How do I change my account settings?', 'Can I have multiple accounts?', 'How do I deactivate my account?'
- Password issues: 'What if I don't receive the reset email?', 'How do I create a stronger password?', 'Can I change my security questions?'
- Billing issues: 'How do I update my payment method?', 'Can I get a refund?', 'How do I view my billing history?'
- Technical issues: 'What browsers are supported?', 'How do I clear my cache?', 'Is there a mobile app?'

Generate 4-5 relevant suggestions (one per line, no numbering):"
    )
}
